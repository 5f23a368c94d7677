use crate::scene::shapes::image::ImageCmd;
use crate::scene::shapes::rect::RectCmd;
use crate::scene::shapes::text::TextCmd;

/// One recorded draw command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect(RectCmd),
    Image(ImageCmd),
    Text(TextCmd),
}

impl DrawCmd {
    /// Whether the command samples a texture.
    pub fn is_textured(&self) -> bool {
        !matches!(self, DrawCmd::Rect(_))
    }
}
