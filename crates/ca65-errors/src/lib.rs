use std::fmt::Display;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
use ca65_syntax::{SyntaxError, SyntaxErrorKind};
pub use text_size::TextRange;

#[salsa::accumulator]
pub struct Diagnostic {
    message: String,
    range: TextRange,
    label: &'static str,
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn error(message: impl Into<String>, range: TextRange) -> Self {
        Self { message: message.into(), range, label: "here" }
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(Level::Error.span(self.range.into()).label(self.label))
                .fold(true),
        );
        renderer.render(message)
    }
}

impl From<&SyntaxError> for Diagnostic {
    fn from(error: &SyntaxError) -> Self {
        let label = match error.kind() {
            SyntaxErrorKind::UnexpectedToken { .. } => "unexpected token",
            SyntaxErrorKind::UnexpectedEol { .. } => "line ends here",
            SyntaxErrorKind::UnexpectedEof { .. } => "file ends here",
            SyntaxErrorKind::InvalidToken => "not valid here",
        };
        Self { message: error.message(), range: error.range(), label }
    }
}
