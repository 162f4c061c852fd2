//! Path → page selection. Stateless and total: every path maps to a page.

use crate::schema::DiseaseKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDescriptor {
    Landing,
    Form(DiseaseKind),
}

/// Exact-match routing; anything unrecognized falls back to the landing page.
pub fn route(path: &str) -> PageDescriptor {
    if path == "/" {
        return PageDescriptor::Landing;
    }
    DiseaseKind::ALL
        .into_iter()
        .find(|d| d.path() == path)
        .map(PageDescriptor::Form)
        .unwrap_or(PageDescriptor::Landing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_landing() {
        assert_eq!(route("/"), PageDescriptor::Landing);
    }

    #[test]
    fn disease_paths_select_their_forms() {
        assert_eq!(route("/heart"), PageDescriptor::Form(DiseaseKind::Heart));
        assert_eq!(
            route("/diabetes_female"),
            PageDescriptor::Form(DiseaseKind::DiabetesFemale)
        );
    }

    #[test]
    fn unknown_paths_fall_back_to_landing() {
        for path in ["/unknown-path", "", "/heart/", "/Heart", "/heart/extra", "/diabetes"] {
            assert_eq!(route(path), PageDescriptor::Landing, "{path}");
        }
    }
}
