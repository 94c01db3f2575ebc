use crate::parser::types::Locator;

/// Convert a [`Locator`] to a Playwright selector string.
///
/// Role locators are lowered to an XPath union over the role's implicit HTML
/// tags plus explicit `role=` attributes, with the accessible name
/// approximated by text content. The bundled driver's `text=` engine covers
/// the plain text cases.
pub fn to_playwright(locator: &Locator) -> String {
    match locator {
        Locator::Text { text, exact, index } => {
            if *index == 0 {
                if *exact {
                    format!("text=\"{}\"", text)
                } else {
                    format!("text={}", text)
                }
            } else if *exact {
                format!(
                    "xpath=(//*[normalize-space(text())={}])[{}]",
                    xpath_literal(text),
                    index + 1
                )
            } else {
                format!(
                    "xpath=(//*[contains(., {})])[{}]",
                    xpath_literal(text),
                    index + 1
                )
            }
        }
        Locator::Role {
            role,
            name,
            exact,
            index,
        } => role_to_xpath(role, name.as_deref(), *exact, *index),
        Locator::Css { selector, index } => {
            if *index == 0 {
                selector.clone()
            } else {
                format!("{} >> nth={}", selector, index)
            }
        }
    }
}

/// Implicit HTML elements for a handful of common ARIA roles.
fn role_tags(role: &str) -> Vec<&'static str> {
    match role.to_lowercase().as_str() {
        "link" => vec!["a[@href]"],
        "button" => vec![
            "button",
            "input[@type=\"button\"]",
            "input[@type=\"submit\"]",
        ],
        "heading" => vec!["h1", "h2", "h3", "h4", "h5", "h6"],
        "checkbox" => vec!["input[@type=\"checkbox\"]"],
        "radio" => vec!["input[@type=\"radio\"]"],
        "textbox" => vec!["input[@type=\"text\"]", "textarea"],
        "img" | "image" => vec!["img"],
        "list" => vec!["ul", "ol"],
        "listitem" => vec!["li"],
        "table" => vec!["table"],
        "row" => vec!["tr"],
        _ => vec![],
    }
}

fn role_to_xpath(role: &str, name: Option<&str>, exact: bool, index: usize) -> String {
    let mut branches: Vec<String> = Vec::new();
    for tag in role_tags(role) {
        branches.push(format!("//{}", tag));
    }
    branches.push(format!("//*[@role=\"{}\"]", role));

    let predicate = match name {
        Some(n) if exact => format!("[normalize-space(.)={}]", xpath_literal(n)),
        Some(n) => format!("[contains(., {})]", xpath_literal(n)),
        None => String::new(),
    };

    let union = branches
        .iter()
        .map(|b| format!("{}{}", b, predicate))
        .collect::<Vec<_>>()
        .join(" | ");

    format!("xpath=({})[{}]", union, index + 1)
}

/// Quote a string as an XPath literal, handling embedded quotes via
/// `concat()` when both quote kinds appear.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{}\"", part))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_exact() {
        let locator = Locator::Text {
            text: "Upgrade to Pro".into(),
            exact: true,
            index: 0,
        };
        assert_eq!(to_playwright(&locator), "text=\"Upgrade to Pro\"");
    }

    #[test]
    fn test_text_contains() {
        let locator = Locator::Text {
            text: "Thanks for voting!".into(),
            exact: false,
            index: 0,
        };
        assert_eq!(to_playwright(&locator), "text=Thanks for voting!");
    }

    #[test]
    fn test_text_indexed_uses_xpath() {
        let locator = Locator::Text {
            text: "Vote".into(),
            exact: true,
            index: 1,
        };
        let sel = to_playwright(&locator);
        assert!(sel.starts_with("xpath=("), "got: {sel}");
        assert!(sel.ends_with(")[2]"), "got: {sel}");
    }

    #[test]
    fn test_role_link_with_exact_name() {
        let locator = Locator::Role {
            role: "link".into(),
            name: Some("Sponsor".into()),
            exact: true,
            index: 0,
        };
        let sel = to_playwright(&locator);
        assert!(sel.contains("//a[@href][normalize-space(.)=\"Sponsor\"]"), "got: {sel}");
        assert!(sel.contains("//*[@role=\"link\"][normalize-space(.)=\"Sponsor\"]"));
        assert!(sel.ends_with(")[1]"));
    }

    #[test]
    fn test_role_button_contains_name() {
        let locator = Locator::Role {
            role: "button".into(),
            name: Some("Vote".into()),
            exact: false,
            index: 0,
        };
        let sel = to_playwright(&locator);
        assert!(sel.contains("//button[contains(., \"Vote\")]"));
        assert!(sel.contains("input[@type=\"submit\"]"));
    }

    #[test]
    fn test_unknown_role_falls_back_to_attribute() {
        let locator = Locator::Role {
            role: "tabpanel".into(),
            name: None,
            exact: false,
            index: 0,
        };
        assert_eq!(
            to_playwright(&locator),
            "xpath=(//*[@role=\"tabpanel\"])[1]"
        );
    }

    #[test]
    fn test_css_with_index() {
        let locator = Locator::Css {
            selector: ".glass-card".into(),
            index: 2,
        };
        assert_eq!(to_playwright(&locator), ".glass-card >> nth=2");
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "\"plain\"");
        assert_eq!(xpath_literal("it\"s"), "'it\"s'");
        assert_eq!(
            xpath_literal("a\"b'c"),
            "concat(\"a\", '\"', \"b'c\")"
        );
    }
}
