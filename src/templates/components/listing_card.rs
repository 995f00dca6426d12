use crate::domain::listing::ListingSummary;
use maud::{html, Markup};

/// "$1,250,000" style price, or "Price on request".
pub fn format_price(price: Option<f64>) -> String {
    let Some(price) = price.filter(|p| p.is_finite() && *p >= 0.0) else {
        return "Price on request".to_string();
    };

    let digits = format!("{:.0}", price);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}

fn facts_line(listing: &ListingSummary) -> String {
    let mut facts = Vec::new();
    if let Some(beds) = listing.bedrooms_total {
        facts.push(format!("{beds} bd"));
    }
    if let Some(baths) = listing.bathrooms_total_integer {
        facts.push(format!("{baths} ba"));
    }
    if let Some(area) = listing.living_area {
        facts.push(format!("{area} sqft"));
    }
    facts.join(" · ")
}

pub fn listing_card(listing: &ListingSummary, site_url: &str) -> Markup {
    let href = format!("{site_url}/listings/{}", listing.listing_key);

    html! {
        div style="margin: 0 0 20px 0; border: 1px solid #eee; border-radius: 6px; overflow: hidden;" {
            @if let Some(photo) = &listing.photo_url {
                a href=(href) {
                    img src=(photo) alt=(listing.address) width="600"
                        style="display: block; width: 100%; height: auto;";
                }
            }
            div style="padding: 12px 16px;" {
                p style="margin: 0; font-size: 1.3em; font-weight: bold;" { (format_price(listing.list_price)) }
                p style="margin: 4px 0;" {
                    a href=(href) style="color: #333; text-decoration: none;" {
                        (listing.address)
                        @if let Some(city) = &listing.city {
                            ", " (city)
                        }
                    }
                }
                @let facts = facts_line(listing);
                @if !facts.is_empty() {
                    p style="margin: 0; color: #666;" { (facts) }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_get_thousands_separators() {
        assert_eq!(format_price(Some(1_250_000.0)), "$1,250,000");
        assert_eq!(format_price(Some(999.0)), "$999");
        assert_eq!(format_price(Some(1000.4)), "$1,000");
        assert_eq!(format_price(None), "Price on request");
    }
}
