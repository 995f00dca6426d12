use maud::{html, Markup, DOCTYPE};

/// Table-free single column layout that survives most mail clients.
pub fn email_layout(title: &str, site_url: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body style="margin: 0; padding: 0; background-color: #f4f4f6; font-family: Arial, sans-serif; color: #333;" {
                div style="max-width: 600px; margin: 0 auto; padding: 24px; background-color: #ffffff;" {
                    (content)
                    hr style="margin-top: 30px; border: none; border-top: 1px solid #eee;";
                    p style="font-size: 0.8em; color: #999;" {
                        "You are receiving this because you saved a search with alerts turned on. "
                        a href={ (site_url) "/account/saved-searches" } style="color: #524ed2;" {
                            "Manage your alerts"
                        }
                        "."
                    }
                }
            }
        }
    }
}
