//! Catalog categories

use serde::Serialize;

use crate::domain::value_objects::{Slug, SlugError};
use crate::domain::CategoryId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub slug: Slug,
}

impl Category {
    pub const MAX_TITLE_CHARS: usize = 100;
}

/// A category ready to be stored; its slug is derived from the title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCategory {
    pub title: String,
    pub slug: Slug,
}

impl NewCategory {
    pub fn from_title(title: impl Into<String>) -> Result<Self, SlugError> {
        let title = title.into();
        let slug = Slug::from_title(&title)?;
        Ok(Self { title, slug })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_slug() {
        let c = NewCategory::from_title("new Category").unwrap();
        assert_eq!(c.title, "new Category");
        assert_eq!(c.slug.as_str(), "new-category");
    }
}
