//! Shared helpers for unit tests: logger setup, canned toolchain fixtures
//! and a scriptable evaluator.

use crate::error::Error;
use crate::evaluate::{EvaluationFailure, Evaluator};
use crate::matrix::Response;
use crate::toolchain::Toolchain;
use crate::tree::Document;
use crate::tree::xml;
use std::collections::HashMap;
use std::path::Path;

/// Initialize env_logger for tests. Safe to call multiple times.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Marker prefix used by all fixtures (the opening quote of the marker's
/// format-string literal, as it appears in source text).
pub const FIXTURE_PREFIX: &str = "\"\\nORBS";

/// The pristine fixture program.
pub const CALC_ORIGINAL: &str =
    "int main() {\n    int a;\n    a = 0;\n    a = a + 1;\n    return a;\n}\n";

/// The instrumented fixture program: a marker call appended on the line of
/// `a = a + 1;`, recording that statement's position (line 4, column 5).
pub const CALC_INSTRUMENTED: &str = "int main() {\n    int a;\n    a = 0;\n    a = a + 1;printf(\"\\nORBS:%d\\n\", 4, 5, a);\n    return a;\n}\n";

/// Toolchain markup of [`CALC_INSTRUMENTED`], position-annotated. Text
/// content concatenates back to the source bytes exactly.
pub const CALC_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<unit xmlns="http://www.srcML.org/srcML/src" xmlns:pos="http://www.srcML.org/srcML/position" language="C" filename="calc.c">"#,
    r#"<function pos:line="1" pos:column="1"><type pos:line="1" pos:column="1">int</type> <name pos:line="1" pos:column="5">main</name><parameter_list pos:line="1" pos:column="9">()</parameter_list> <block pos:line="1" pos:column="12">{"#,
    "\n    ",
    r#"<decl_stmt pos:line="2" pos:column="5">int a;</decl_stmt>"#,
    "\n    ",
    r#"<expr_stmt pos:line="3" pos:column="5"><expr><name pos:line="3" pos:column="5">a</name> <operator pos:line="3" pos:column="7">=</operator> <literal pos:line="3" pos:column="9">0</literal></expr>;</expr_stmt>"#,
    "\n    ",
    r#"<expr_stmt pos:line="4" pos:column="5"><expr><name pos:line="4" pos:column="5">a</name> <operator pos:line="4" pos:column="7">=</operator> <name pos:line="4" pos:column="9">a</name> <operator pos:line="4" pos:column="11">+</operator> <literal pos:line="4" pos:column="13">1</literal></expr>;</expr_stmt>"#,
    r#"<expr_stmt><expr><call><name>printf</name><argument_list>(<argument><expr><literal>"\nORBS:%d\n"</literal></expr></argument>, <argument><expr><literal>4</literal></expr></argument>, <argument><expr><literal>5</literal></expr></argument>, <argument><expr><name>a</name></expr></argument>)</argument_list></call></expr>;</expr_stmt>"#,
    "\n    ",
    r#"<return pos:line="5" pos:column="5">return a;</return>"#,
    "\n}</block></function>\n</unit>",
);

/// Toolchain markup of [`CALC_ORIGINAL`]: [`CALC_XML`] without the marker
/// statement, trailing line trivia back on its target.
pub const CALC_ORIGINAL_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<unit xmlns="http://www.srcML.org/srcML/src" xmlns:pos="http://www.srcML.org/srcML/position" language="C" filename="calc_original.c">"#,
    r#"<function pos:line="1" pos:column="1"><type pos:line="1" pos:column="1">int</type> <name pos:line="1" pos:column="5">main</name><parameter_list pos:line="1" pos:column="9">()</parameter_list> <block pos:line="1" pos:column="12">{"#,
    "\n    ",
    r#"<decl_stmt pos:line="2" pos:column="5">int a;</decl_stmt>"#,
    "\n    ",
    r#"<expr_stmt pos:line="3" pos:column="5"><expr><name pos:line="3" pos:column="5">a</name> <operator pos:line="3" pos:column="7">=</operator> <literal pos:line="3" pos:column="9">0</literal></expr>;</expr_stmt>"#,
    "\n    ",
    r#"<expr_stmt pos:line="4" pos:column="5"><expr><name pos:line="4" pos:column="5">a</name> <operator pos:line="4" pos:column="7">=</operator> <name pos:line="4" pos:column="9">a</name> <operator pos:line="4" pos:column="11">+</operator> <literal pos:line="4" pos:column="13">1</literal></expr>;</expr_stmt>"#,
    "\n    ",
    r#"<return pos:line="5" pos:column="5">return a;</return>"#,
    "\n}</block></function>\n</unit>",
);

/// Toolchain stub serving canned markup by file name. Rendering is the real
/// text-concatenation printer.
#[derive(Default)]
pub struct FixtureToolchain {
    documents: HashMap<String, String>,
}

impl FixtureToolchain {
    pub fn new() -> Self {
        FixtureToolchain::default()
    }

    /// The standard calc fixture: `calc.c` plus its reference markup.
    pub fn calc() -> Self {
        let mut toolchain = FixtureToolchain::new();
        toolchain.insert("calc.c", CALC_XML);
        toolchain.insert("calc_original.c", CALC_ORIGINAL_XML);
        toolchain
    }

    pub fn insert(&mut self, file_name: &str, xml: &str) {
        self.documents.insert(file_name.to_string(), xml.to_string());
    }
}

impl Toolchain for FixtureToolchain {
    fn parse(&self, path: &Path, _with_positions: bool) -> Result<Document, Error> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let canned = self
            .documents
            .get(name)
            .ok_or_else(|| Error::toolchain(format!("no fixture markup for {name}")))?;
        xml::parse_document(canned.as_bytes())
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, Error> {
        Ok(doc.source_bytes())
    }
}

/// Populate `dir` with the calc fixture sources.
pub fn write_calc_sources(dir: &Path) {
    std::fs::write(dir.join("calc.c"), CALC_INSTRUMENTED).unwrap();
    std::fs::write(dir.join("calc_original.c"), CALC_ORIGINAL).unwrap();
}

/// Build a complete throwaway project: one line-oriented target file, the
/// three scripts, a two-entry test suite and a single criterion.
pub fn scaffold_project(code: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("config")).unwrap();
    std::fs::create_dir_all(root.join("program")).unwrap();
    std::fs::create_dir_all(root.join("scripts").join("testsuite")).unwrap();

    std::fs::write(root.join("program").join("code.txt"), code).unwrap();
    std::fs::write(root.join("scripts").join("compile"), "exit 0\n").unwrap();
    std::fs::write(root.join("scripts").join("execute"), "echo 00\n").unwrap();
    std::fs::write(root.join("scripts").join("terminate"), "true\n").unwrap();
    std::fs::write(root.join("scripts").join("testsuite").join("t1"), "one\n").unwrap();
    std::fs::write(root.join("scripts").join("testsuite").join("t2"), "two\n").unwrap();
    std::fs::write(root.join("scripts").join("criteria"), "stdout\n").unwrap();
    std::fs::write(
        root.join("config").join("config.toml"),
        "[program]\norig_dir = \"program\"\nfiles = [\"code.txt\"]\n\n[scripts]\ndir = \"scripts\"\n",
    )
    .unwrap();
    dir
}

/// Evaluator scripted per deletion mask. Looks up the `factor` key recorded
/// in the variant's work directory; masks without an entry get the all-pass
/// response.
pub struct MockEvaluator {
    response_len: usize,
    by_key: HashMap<String, Response>,
}

impl MockEvaluator {
    pub fn all_passing(response_len: usize) -> Self {
        MockEvaluator {
            response_len,
            by_key: HashMap::new(),
        }
    }

    pub fn with_response(mut self, key: &str, response: Response) -> Self {
        self.by_key.insert(key.to_string(), response);
        self
    }
}

impl Evaluator for MockEvaluator {
    fn response_len(&self) -> usize {
        self.response_len
    }

    fn evaluate(&self, work_dir: &Path) -> Result<Response, EvaluationFailure> {
        let key = std::fs::read_to_string(work_dir.join("factor"))
            .map_err(|e| EvaluationFailure(format!("no factor record in work dir: {e}")))?;
        Ok(self
            .by_key
            .get(key.trim())
            .cloned()
            .unwrap_or_else(|| Response::new(true, vec![true; self.response_len])))
    }
}
