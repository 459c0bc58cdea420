//! Page title
//!
//! Values of the page-title rules, joined; the window title when none of
//! them matches.

use webmod_dom::Page;

use crate::matcher::MatchResult;
use crate::validate::LoadedModule;

/// Page title: page-title rules' values joined, else the window title
///
/// Results of other rules may be passed in and are ignored.
pub fn page_title<'a>(
    module: &LoadedModule,
    page: &Page,
    results: impl IntoIterator<Item = &'a MatchResult>,
) -> String {
    let parts: Vec<String> = results
        .into_iter()
        .filter_map(|r| {
            let rule = module.rule(r.rule);
            if !rule.is_page_title {
                return None;
            }
            let element = r.primary?;
            let value = rule.custom_value.clone().unwrap_or_else(|| page.label(element));
            Some(value).filter(|v| !v.is_empty())
        })
        .collect();
    if !parts.is_empty() {
        return parts.join(" - ");
    }
    if page.window_title().is_empty() {
        page.title()
    } else {
        page.window_title().to_string()
    }
}
