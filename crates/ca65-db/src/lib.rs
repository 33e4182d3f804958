use ca65::{SyntaxTree, TextRange};
pub use ca65_errors::Diagnostic;
use camino::Utf8PathBuf;
pub use line_index::LineIndex;
use salsa::{Accumulator as _, Database};

#[salsa::input(debug)]
pub struct File {
    #[returns(ref)]
    pub path: Utf8PathBuf,
    #[returns(deref)]
    pub text: String,
}

#[salsa::tracked]
impl File {
    #[salsa::tracked(returns(ref), no_eq)]
    pub fn line_index(self, db: &dyn Database) -> LineIndex {
        LineIndex::new(self.text(db))
    }

    /// The file's syntax tree, or `None` when the grammar failed to build.
    #[salsa::tracked(returns(ref))]
    pub fn parse(self, db: &dyn Database) -> Option<SyntaxTree> {
        match ca65::load_grammar() {
            Ok(grammar) => Some(grammar.parse(self.text(db))),
            Err(error) => {
                log::error!("cannot parse `{}`: {error}", self.path(db));
                Diagnostic::error(error.to_string(), TextRange::default()).accumulate(db);
                None
            }
        }
    }
}

#[salsa::tracked]
pub fn check_file(db: &dyn Database, file: File) {
    let Some(tree) = file.parse(db) else { return };
    for error in tree.errors() {
        Diagnostic::from(error).accumulate(db);
    }
}
