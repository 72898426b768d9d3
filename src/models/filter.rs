//! Business listing filter built from query parameters.

use serde::Deserialize;

/// Raw query string of `GET /api/businesses`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBusinessesParams {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub min_rating: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Name,
    AverageRating,
    /// Size of the like set, derived at query time
    Likes,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(SortKey::CreatedAt),
            "name" => Some(SortKey::Name),
            "averageRating" => Some(SortKey::AverageRating),
            "likes" => Some(SortKey::Likes),
            _ => None,
        }
    }

    /// SQL expression the listing query orders by.
    pub fn order_expr(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "b.created_at",
            SortKey::Name => "b.name COLLATE NOCASE",
            SortKey::AverageRating => "b.average_rating",
            SortKey::Likes => "like_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated listing filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessFilter {
    /// Lowercased keyword, matched as a substring
    pub keyword: Option<String>,
    pub min_rating: Option<f64>,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl BusinessFilter {
    pub fn from_params(params: &ListBusinessesParams) -> Result<Self, String> {
        let keyword = params
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let min_rating = match params.min_rating.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Some(value),
                _ => return Err(format!("minRating must be a number, got '{}'", raw)),
            },
        };

        let sort_by = match params.sort_by.as_deref() {
            None | Some("") => SortKey::default(),
            Some(raw) => SortKey::parse(raw).ok_or_else(|| {
                format!(
                    "Unsupported sortBy '{}'; expected createdAt, name, averageRating or likes",
                    raw
                )
            })?,
        };

        let order = match params.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        Ok(Self {
            keyword,
            min_rating,
            sort_by,
            order,
        })
    }

    /// LIKE pattern for the keyword with wildcards escaped by `\`.
    pub fn like_pattern(&self) -> Option<String> {
        self.keyword.as_ref().map(|k| {
            let mut pattern = String::with_capacity(k.len() + 2);
            pattern.push('%');
            for c in k.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }
}
