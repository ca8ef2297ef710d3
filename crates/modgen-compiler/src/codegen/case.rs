//! Case conversion helpers handed to the template renderer.

use convert_case::{Case, Casing};

/// A named string transform usable from templates as a filter.
pub type Helper = fn(&str) -> String;

pub fn pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

pub fn camel_case(s: &str) -> String {
    s.to_case(Case::Camel)
}

pub fn snake_case(s: &str) -> String {
    s.to_case(Case::Snake)
}

pub fn kebab_case(s: &str) -> String {
    s.to_case(Case::Kebab)
}

pub fn title_case(s: &str) -> String {
    s.to_case(Case::Title)
}

/// Table of helpers passed to a [`super::TemplateRenderer`].
///
/// There is no global registry: a renderer only knows the helpers it was
/// built with.
#[derive(Debug, Clone, Default)]
pub struct Helpers {
    entries: Vec<(&'static str, Helper)>,
}

impl Helpers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The case helpers every template relies on.
    pub fn standard() -> Self {
        Self::new()
            .with("pascal_case", pascal_case)
            .with("camel_case", camel_case)
            .with("snake_case", snake_case)
            .with("kebab_case", kebab_case)
            .with("title_case", title_case)
    }

    /// Adds or replaces a helper.
    pub fn with(mut self, name: &'static str, helper: Helper) -> Self {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = helper,
            None => self.entries.push((name, helper)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Helper> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, h)| *h)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Helper)> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_helpers() {
        assert_eq!(pascal_case("vehicle_series"), "VehicleSeries");
        assert_eq!(camel_case("VehicleSeries"), "vehicleSeries");
        assert_eq!(snake_case("VehicleSeries"), "vehicle_series");
        assert_eq!(kebab_case("VehicleSeries"), "vehicle-series");
        assert_eq!(title_case("vehicle_series"), "Vehicle Series");
    }

    #[test]
    fn test_helpers_table() {
        let helpers = Helpers::new().with("shout", |s| s.to_uppercase());
        assert_eq!(helpers.get("shout").map(|h| h("hi")), Some("HI".to_string()));
        assert!(helpers.get("pascal_case").is_none());
        assert_eq!(Helpers::standard().iter().count(), 5);
    }
}
