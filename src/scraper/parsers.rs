use super::ExtractionError;
use crate::models::{RawExtraction, SiteProfile};
use scraper::{Html, Selector};
use tracing::warn;

/// Pull the raw price fields out of a loaded product page.
///
/// A field whose selector matches nothing (or only whitespace) comes back as `None`.
/// An unparsable price or mrp selector is an error; a bad availability selector only
/// loses the availability text.
pub fn extract(doc: &Html, profile: &SiteProfile) -> Result<RawExtraction, ExtractionError> {
    let sel = &profile.selectors;

    let availability_text = match &sel.availability {
        Some(s) => first_text(doc, "availability", s).unwrap_or_else(|e| {
            warn!("{}: {}", profile.site_name, e);
            None
        }),
        None => None,
    };

    Ok(RawExtraction {
        current_price_text: first_text(doc, "price", &sel.price)?,
        mrp_text: first_text(doc, "mrp", &sel.mrp)?,
        availability_text,
    })
}

/// Parse every selector of a profile up front, so a typo fails the run before any
/// page is loaded.
pub fn check_selectors(profile: &SiteProfile) -> Result<(), ExtractionError> {
    let sel = &profile.selectors;
    compile("price", &sel.price)?;
    compile("mrp", &sel.mrp)?;
    if let Some(s) = &sel.availability {
        compile("availability", s)?;
    }
    Ok(())
}

fn compile(field: &str, selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

fn first_text(doc: &Html, field: &str, selector: &str) -> Result<Option<String>, ExtractionError> {
    let parsed = compile(field, selector)?;

    Ok(doc
        .select(&parsed)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectorSet;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
          <div id="corePrice">
            <span class="a-price"><span class="a-offscreen">₹1,000.00</span><span>1,000</span></span>
            <span class="a-text-price"><span class="a-offscreen">₹1,500.00</span></span>
          </div>
          <div id="availability"><span> In stock </span></div>
          <span class="a-price"><span class="a-offscreen">₹9.00</span></span>
        </body></html>
    "#;

    #[test]
    fn test_extract_amazon_layout() {
        let doc = Html::parse_document(PRODUCT_PAGE);
        let raw = extract(&doc, &SiteProfile::amazon()).unwrap();
        assert_eq!(raw.current_price_text.as_deref(), Some("₹1,000.00"));
        assert_eq!(raw.mrp_text.as_deref(), Some("₹1,500.00"));
        assert_eq!(raw.availability_text.as_deref(), Some("In stock"));
    }

    #[test]
    fn test_missing_elements_are_absent_not_errors() {
        let doc = Html::parse_document("<html><body><h1>Robot check</h1></body></html>");
        let raw = extract(&doc, &SiteProfile::amazon()).unwrap();
        assert_eq!(raw, RawExtraction::default());
    }

    #[test]
    fn test_blank_text_is_absent() {
        let doc = Html::parse_document(
            r#"<span class="a-price"><span class="a-offscreen">   </span></span>"#,
        );
        let raw = extract(&doc, &SiteProfile::amazon()).unwrap();
        assert!(raw.current_price_text.is_none());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let profile = SiteProfile {
            site_name: "broken".into(),
            selectors: SelectorSet {
                price: "span[[".into(),
                mrp: "span.mrp".into(),
                availability: None,
            },
        };
        let doc = Html::parse_document("<p>x</p>");
        let err = extract(&doc, &profile).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidSelector { ref field, .. } if field == "price"));
        assert!(check_selectors(&profile).is_err());
    }

    #[test]
    fn test_bad_availability_selector_keeps_prices() {
        let mut profile = SiteProfile::amazon();
        profile.selectors.availability = Some("div[[".into());

        let doc = Html::parse_document(
            r#"<span class="a-price"><span class="a-offscreen">$5.00</span></span>"#,
        );
        let raw = extract(&doc, &profile).unwrap();
        assert_eq!(raw.current_price_text.as_deref(), Some("$5.00"));
        assert!(raw.availability_text.is_none());

        let err = check_selectors(&profile).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidSelector { ref field, .. } if field == "availability"));
    }

    #[test]
    fn test_builtin_profile_selectors_parse() {
        assert!(check_selectors(&SiteProfile::amazon()).is_ok());
    }
}
