// templates/emails/listing_alert.rs

use crate::domain::listing::ListingSummary;
use crate::templates::{email_layout, listing_card};
use maud::{html, Markup};

pub fn listing_alert_subject(search_name: &str, count: usize) -> String {
    match count {
        1 => format!("1 new listing for \"{search_name}\""),
        n => format!("{n} new listings for \"{search_name}\""),
    }
}

pub fn listing_alert_email(
    recipient_name: Option<&str>,
    search_name: &str,
    listings: &[ListingSummary],
    site_url: &str,
) -> Markup {
    email_layout(
        &listing_alert_subject(search_name, listings.len()),
        site_url,
        html! {
            h2 style="margin-top: 0;" {
                @if let Some(name) = recipient_name {
                    "Hi " (name) ","
                } @else {
                    "Hi there,"
                }
            }
            p {
                "New homes just hit the market that match your saved search "
                strong { (search_name) }
                ":"
            }
            @for listing in listings {
                (listing_card(listing, site_url))
            }
            p style="margin: 25px 0;" {
                a href={ (site_url) "/search" }
                    style="background-color: #524ed2; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; display: inline-block;" {
                    "See all results"
                }
            }
        },
    )
}
