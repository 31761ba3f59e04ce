//! Which fragments make up a page.

use pwp_core::{Request, WorkerConfig, WorkerError};

/// Position of a fragment in the composed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentSlot {
    Header,
    Page,
    Footer,
}

impl FragmentSlot {
    /// Slots in output order.
    pub const ORDER: [FragmentSlot; 3] = [Self::Header, Self::Page, Self::Footer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Page => "page",
            Self::Footer => "footer",
        }
    }
}

impl std::fmt::Display for FragmentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three fragment requests behind one navigation.
#[derive(Debug, Clone)]
pub struct FragmentPlan {
    pub header: Request,
    pub page: Request,
    pub footer: Request,
}

impl FragmentPlan {
    /// Plan for a full-page navigation.
    ///
    /// The page body is the navigated locator with the fragment marker
    /// appended; header and footer are the shared shell fragments.
    pub fn for_navigation(config: &WorkerConfig, navigation: &Request) -> Result<Self, WorkerError> {
        Ok(Self {
            header: Request::get(config.header_url()?),
            page: Request::get(navigation.url().clone())
                .with_query_param(&config.fragment_param, &config.fragment_value),
            footer: Request::get(config.footer_url()?),
        })
    }

    /// The request for a slot.
    pub fn request(&self, slot: FragmentSlot) -> &Request {
        match slot {
            FragmentSlot::Header => &self.header,
            FragmentSlot::Page => &self.page,
            FragmentSlot::Footer => &self.footer,
        }
    }

    /// Slots and requests in output order.
    pub fn parts(&self) -> impl Iterator<Item = (FragmentSlot, &Request)> + '_ {
        FragmentSlot::ORDER
            .into_iter()
            .map(move |slot| (slot, self.request(slot)))
    }
}
