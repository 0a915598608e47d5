//! DOMRenderer: the thin layer writing resolved values into the host page.
//!
//! `DomSurface` is what a host binding implements; `BannerDom` maps engine
//! concepts (banner shown, widgets, colours) onto it.

use banners_types::{AssetData, WidgetsConfig};
use std::sync::Arc;

use crate::config::{css, PLUGIN_PAGE_PROPS};
use crate::quote::Quote;
use crate::session::RenderSession;

pub trait DomSurface: Send + Sync {
    /// The host's page-type attribute (`data-page` on the body).
    fn page_type(&self) -> Option<String>;

    /// Set a custom property on the document root; `""` clears it.
    fn set_style_var(&self, name: &str, value: &str);

    fn computed_style_var(&self, name: &str) -> Option<String>;

    fn toggle_body_class(&self, class: &str, on: bool);

    /// Insert the banner container (with the widgets area) if it is missing.
    fn ensure_container(&self);

    fn set_container_visible(&self, visible: bool);

    fn remove_container(&self);

    fn set_calendar_visible(&self, visible: bool);

    fn toggle_widgets_class(&self, class: &str, on: bool);

    /// Replace the quote widget's content; `None` removes the quote element.
    fn set_quote_html(&self, html: Option<&str>);

    /// Hide the property rows with these keys in the page's properties block.
    fn hide_page_props(&self, keys: &[&str]);

    /// Start watching the page's properties block, tagging notifications with
    /// `watch_id`. False when there is no properties block to watch.
    fn watch_props(&self, watch_id: u64) -> bool;

    fn unwatch_props(&self);

    /// Any CSS colour -> RGB. Hosts with a real style engine should override.
    fn resolve_rgb(&self, color: &str) -> Option<[u8; 3]> {
        parse_css_rgb(color)
    }
}

/// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(...)` and `rgba(...)`.
pub fn parse_css_rgb(color: &str) -> Option<[u8; 3]> {
    let color = color.trim();

    if let Some(hex) = color.strip_prefix('#') {
        let digit = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
        return match hex.len() {
            3 | 4 => Some([digit(0, 1)? * 17, digit(1, 1)? * 17, digit(2, 1)? * 17]),
            6 | 8 => Some([digit(0, 2)?, digit(2, 2)?, digit(4, 2)?]),
            _ => None,
        };
    }

    let inner = color
        .strip_prefix("rgba(")
        .or_else(|| color.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let channels: Vec<u8> = inner
        .split([',', ' ', '/'])
        .filter(|part| !part.is_empty())
        .take(3)
        .map(|part| part.trim().parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8))
        .collect::<Option<_>>()?;

    match channels.as_slice() {
        [r, g, b] => Some([*r, *g, *b]),
        _ => None,
    }
}

#[derive(Clone)]
pub struct BannerDom {
    surface: Arc<dyn DomSurface>,
}

impl BannerDom {
    pub fn new(surface: Arc<dyn DomSurface>) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &Arc<dyn DomSurface> {
        &self.surface
    }

    pub fn page_type(&self) -> Option<String> {
        self.surface.page_type()
    }

    /// Container in place but hidden until a banner renders.
    pub fn ensure_placeholder(&self) {
        self.surface.ensure_container();
        self.surface.set_container_visible(false);
    }

    pub fn hide_plugin_props(&self) {
        self.surface.hide_page_props(PLUGIN_PAGE_PROPS);
    }

    pub fn show_banner(&self, asset: &AssetData, source: &str) {
        self.surface.toggle_body_class(css::BANNER_ACTIVE_CLASS, true);
        self.surface
            .set_style_var(css::BANNER_HEIGHT, asset.banner_height.as_deref().unwrap_or_default());
        self.surface
            .set_style_var(css::BANNER_ALIGN, asset.banner_align.as_deref().unwrap_or_default());
        self.surface.set_style_var(css::PAGE_BANNER, &format!("url({})", source));
    }

    pub fn hide_banner(&self) {
        self.surface.toggle_body_class(css::BANNER_ACTIVE_CLASS, false);
        self.surface.set_style_var(css::PAGE_BANNER, "");
        self.surface.set_style_var(css::BANNER_HEIGHT, "");
        self.surface.set_style_var(css::BANNER_ALIGN, "");
        self.surface.set_container_visible(false);
    }

    /// Calendar and quote for the current pass, then reveal the container.
    pub fn render_widgets(&self, session: &RenderSession, quote: Option<&Quote>) {
        let widgets = &session.settings.widgets_config;

        let calendar_visible = widgets.calendar.enabled.allows(session.page.is_journal_surface());
        self.surface.set_calendar_visible(calendar_visible);
        self.surface.toggle_widgets_class(css::WIDGETS_BG_CLASS, calendar_visible);

        match quote {
            Some(quote) => {
                self.surface.set_style_var(css::QUOTE_FONT_SIZE, quote.font_size);
                self.surface.set_style_var(css::QUOTE_SIZE, &widgets.quote.size);
                self.surface.set_style_var(css::QUOTE_MAX_WIDTH, &widgets.quote.max_width);
                self.surface.set_quote_html(Some(&quote.html));
            }
            None => self.surface.set_quote_html(None),
        }

        self.surface.set_container_visible(true);
    }

    pub fn apply_widget_vars(&self, widgets: &WidgetsConfig) {
        self.surface.set_style_var(css::CALENDAR_WIDTH, &widgets.calendar.width);
    }

    /// Copy the theme's primary colours into the widget colour variables as `"r, g, b"`.
    pub fn sample_colors(&self) {
        let pairs = [
            (css::HOST_PRIMARY_TEXT_COLOR, css::WIDGETS_TEXT_COLOR),
            (css::HOST_PRIMARY_BG_COLOR, css::WIDGETS_BG_COLOR),
        ];
        for (source, target) in pairs {
            let rgb = self
                .surface
                .computed_style_var(source)
                .and_then(|color| self.surface.resolve_rgb(color.trim()));
            match rgb {
                Some([r, g, b]) => self.surface.set_style_var(target, &format!("{}, {}, {}", r, g, b)),
                None => log::debug!("[BANNERS] Could not sample {}", source),
            }
        }
    }

    pub fn teardown(&self) {
        self.surface.unwatch_props();
        self.surface.remove_container();
        self.surface.toggle_body_class(css::BANNER_ACTIVE_CLASS, false);
        self.surface.toggle_body_class(css::ICON_ACTIVE_CLASS, false);
    }
}
