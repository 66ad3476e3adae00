pub const DEFAULT_SIZE: u32 = 180;

/// What the frontend needs to draw the QR code that leads guests to a
/// restaurant's feedback form.
#[derive(Debug, Clone, PartialEq)]
pub struct QrCode {
    pub restaurant_id: i32,
    pub url: String,
    pub size: u32,
}

impl QrCode {
    pub fn new(frontend_url: &str, restaurant_id: i32, size: Option<u32>) -> Self {
        Self {
            restaurant_id,
            url: feedback_form_url(frontend_url, restaurant_id),
            size: size.filter(|s| *s > 0).unwrap_or(DEFAULT_SIZE),
        }
    }
}

pub fn feedback_form_url(frontend_url: &str, restaurant_id: i32) -> String {
    format!(
        "{}/user-feedback?restaurant={}",
        frontend_url.trim_end_matches('/'),
        restaurant_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_at_the_feedback_form() {
        let qr = QrCode::new("https://mutfakyazilim.com/", 7, None);
        assert_eq!(qr.url, "https://mutfakyazilim.com/user-feedback?restaurant=7");
        assert_eq!(qr.size, DEFAULT_SIZE);
    }

    #[test]
    fn keeps_requested_size() {
        assert_eq!(QrCode::new("http://localhost:8080", 1, Some(300)).size, 300);
        assert_eq!(QrCode::new("http://localhost:8080", 1, Some(0)).size, DEFAULT_SIZE);
    }
}
