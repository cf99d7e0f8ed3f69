//! Optional boundary checks for render submissions.
//!
//! The endpoints forward input unvalidated by default; these checks only run
//! when `validation.enabled` is set.

use render_video_protocol::RenderRequest;
use url::Url;

use super::error::DomainError;

pub fn validate_render_request(request: &RenderRequest) -> Result<(), DomainError> {
    require_text("mainText", &request.main_text)?;
    require_text("subText", &request.sub_text)?;
    validate_logo_url(&request.logo_url)?;
    validate_color(&request.primary_color)?;
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_logo_url(value: &str) -> Result<(), DomainError> {
    let url = Url::parse(value.trim())
        .map_err(|err| DomainError::validation("logoUrl", format!("not a valid URL: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(DomainError::validation(
            "logoUrl",
            format!("unsupported scheme `{scheme}`"),
        )),
    }
}

/// CSS named colors plus `transparent`, sorted for binary search.
const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue", "darkcyan",
    "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki", "darkmagenta",
    "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon", "darkseagreen",
    "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise", "darkviolet", "deeppink",
    "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick", "floralwhite", "forestgreen",
    "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod", "gray", "green", "greenyellow",
    "grey", "honeydew", "hotpink", "indianred", "indigo", "ivory", "khaki", "lavender",
    "lavenderblush", "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
    "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey", "lightpink", "lightsalmon",
    "lightseagreen", "lightskyblue", "lightslategray", "lightslategrey", "lightsteelblue",
    "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon", "mediumaquamarine",
    "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen", "mediumslateblue",
    "mediumspringgreen", "mediumturquoise", "mediumvioletred", "midnightblue", "mintcream",
    "mistyrose", "moccasin", "navajowhite", "navy", "oldlace", "olive", "olivedrab", "orange",
    "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise", "palevioletred",
    "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "purple", "rebeccapurple",
    "red", "rosybrown", "royalblue", "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell",
    "sienna", "silver", "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen",
    "steelblue", "tan", "teal", "thistle", "tomato", "transparent", "turquoise", "violet", "wheat",
    "white", "whitesmoke", "yellow", "yellowgreen",
];

/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, the `rgb()`/`rgba()`/
/// `hsl()`/`hsla()` functional forms and CSS color keywords.
fn validate_color(value: &str) -> Result<(), DomainError> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let valid_len = matches!(hex.len(), 3 | 4 | 6 | 8);
        if valid_len && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(());
        }
        return Err(DomainError::validation(
            "primaryColor",
            format!("`{value}` is not a hex color"),
        ));
    }

    let lower = value.to_ascii_lowercase();
    if NAMED_COLORS.binary_search(&lower.as_str()).is_ok() {
        return Ok(());
    }
    for prefix in ["rgba(", "rgb(", "hsla(", "hsl("] {
        if let Some(args) = lower.strip_prefix(prefix) {
            let Some(args) = args.strip_suffix(')') else {
                break;
            };
            let parts = args
                .split([',', ' ', '/'])
                .filter(|part| !part.is_empty())
                .count();
            if (3..=4).contains(&parts) {
                return Ok(());
            }
            break;
        }
    }

    Err(DomainError::validation(
        "primaryColor",
        format!("`{value}` is not a supported color"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(logo_url: &str, primary_color: &str) -> RenderRequest {
        RenderRequest {
            main_text: "Koala".into(),
            sub_text: "Hi".into(),
            logo_url: logo_url.into(),
            primary_color: primary_color.into(),
        }
    }

    #[test]
    fn accepts_the_default_form_values() {
        assert_eq!(
            validate_render_request(&request("https://valid/logo.png", "#f6e58d")),
            Ok(())
        );
        assert_eq!(
            validate_render_request(&request("https://x/y.png", "#fff")),
            Ok(())
        );
    }

    #[test]
    fn rejects_relative_logo_url() {
        let err = validate_render_request(&request("logo.png", "#fff")).expect_err("invalid");
        assert_eq!(err.field(), Some("logoUrl"));
    }

    #[test]
    fn rejects_non_http_logo_url() {
        let err =
            validate_render_request(&request("ftp://host/logo.png", "#fff")).expect_err("invalid");
        assert_eq!(err.field(), Some("logoUrl"));
    }

    #[test]
    fn color_forms() {
        assert!(validate_color("#abcd").is_ok());
        assert!(validate_color("rgb(246, 229, 141)").is_ok());
        assert!(validate_color("hsla(50 85% 76% / 0.5)").is_ok());
        assert!(validate_color("#ggg").is_err());
        assert!(validate_color("#12345").is_err());
        assert!(validate_color("rgb(1,2)").is_err());
        assert!(validate_color("not-a-color").is_err());
    }

    #[test]
    fn named_colors_are_accepted() {
        for name in ["red", "Chartreuse", "rebeccapurple", "transparent"] {
            assert!(validate_color(name).is_ok(), "{name} should be accepted");
        }
        assert_eq!(
            validate_render_request(&request("https://x/y.png", "red")),
            Ok(())
        );
        assert!(validate_color("reddish").is_err());
    }

    #[test]
    fn named_color_table_is_sorted() {
        assert!(NAMED_COLORS.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut invalid = request("https://x/y.png", "#fff");
        invalid.sub_text = "   ".into();
        let err = validate_render_request(&invalid).expect_err("invalid");
        assert_eq!(err.field(), Some("subText"));
    }
}
