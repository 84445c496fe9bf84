//! DOM helpers shared by the page parsers.

use scraper::{ElementRef, Html, Selector};

/// Trimmed text content of an element
pub fn element_text(elem: &ElementRef) -> String {
    elem.text().collect::<String>().trim().to_string()
}

/// First element matching `css`
pub fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// First element matching `css` inside `elem`
pub fn select_first_in<'a>(elem: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    elem.select(&selector).next()
}

/// Trimmed text of the first element matching `css`
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    select_first(document, css).map(|e| element_text(&e))
}

/// All `td` cells of a row
pub fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let td_selector = Selector::parse("td").unwrap();
    row.select(&td_selector).collect()
}

/// First `landmark_tag` element, in document order, whose whole trimmed text
/// equals `label`
pub fn find_landmark<'a>(document: &'a Html, landmark_tag: &str, label: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(landmark_tag).ok()?;
    document.select(&selector).find(|e| element_text(e) == label)
}

/// First element with tag `target_tag` following `landmark` among its
/// siblings. A sibling that is not itself the target but wraps one yields
/// the wrapped element.
pub fn following_element<'a>(landmark: ElementRef<'a>, target_tag: &str) -> Option<ElementRef<'a>> {
    let nested = Selector::parse(target_tag).ok()?;
    landmark
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find_map(|sibling| {
            if sibling.value().name() == target_tag {
                Some(sibling)
            } else {
                sibling.select(&nested).next()
            }
        })
}

/// Locate a labeled section (e.g. the "PMU" panel) and return the first
/// `target_tag` element that follows it.
pub fn find_after_landmark<'a>(
    document: &'a Html,
    landmark_tag: &str,
    label: &str,
    target_tag: &str,
) -> Option<ElementRef<'a>> {
    let landmark = find_landmark(document, landmark_tag, label)?;
    following_element(landmark, target_tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<html><body>
<div id="rapports">
  <div>Rapports</div>
  <div>  PMU </div>
  <p>intro</p>
  <table id="pmu"><tr><td>1</td></tr></table>
  <div>Genybet</div>
  <div class="wrap"><table id="genybet"><tr><td>2</td></tr></table></div>
</div>
</body></html>"#;

    #[test]
    fn test_find_landmark_matches_whole_text() {
        let document = Html::parse_document(SAMPLE_HTML);
        let landmark = find_landmark(&document, "div", "PMU").unwrap();
        assert_eq!(element_text(&landmark), "PMU");
        // The outer container's text contains "PMU" but is not equal to it
        assert!(find_landmark(&document, "div", "Rapports PMU").is_none());
    }

    #[test]
    fn test_find_after_landmark() {
        let document = Html::parse_document(SAMPLE_HTML);
        let table = find_after_landmark(&document, "div", "PMU", "table").unwrap();
        assert_eq!(table.value().attr("id"), Some("pmu"));
    }

    #[test]
    fn test_following_element_descends_into_wrapper() {
        let document = Html::parse_document(SAMPLE_HTML);
        let table = find_after_landmark(&document, "div", "Genybet", "table").unwrap();
        assert_eq!(table.value().attr("id"), Some("genybet"));
    }

    #[test]
    fn test_missing_landmark() {
        let document = Html::parse_document(SAMPLE_HTML);
        assert!(find_after_landmark(&document, "div", "Quinté", "table").is_none());
        assert!(first_text(&document, "span.absent").is_none());
    }
}
