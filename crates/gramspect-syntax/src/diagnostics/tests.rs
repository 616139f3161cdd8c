//! Tests for diagnostics collection and plain rendering.

use gramspect_core::Severity;
use rowan::TextRange;

use super::Diagnostics;

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn collects_in_order() {
    let mut diags = Diagnostics::new();
    diags.error("first", range(0, 1)).emit();
    diags.warning("second", range(2, 3)).emit();
    diags.error("third", range(4, 5)).emit();

    let messages: Vec<_> = diags.iter().map(|d| d.message().to_owned()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
    assert_eq!(diags.error_count(), 2);
    assert_eq!(diags.warning_count(), 1);
    assert!(diags.has_errors());
}

#[test]
fn builder_attaches_fix_and_related() {
    let mut diags = Diagnostics::new();
    diags
        .error("missing ';'", range(10, 11))
        .fix("insert ';'", ";")
        .related_to("rule starts here", range(0, 4))
        .emit();

    let msg = diags.iter().next().unwrap();
    assert_eq!(msg.fix().unwrap().description(), "insert ';'");
    assert_eq!(msg.related.len(), 1);
}

#[test]
fn severity_override() {
    let mut diags = Diagnostics::new();
    diags
        .error("advisory", range(0, 0))
        .severity(Severity::Info)
        .emit();
    assert!(!diags.has_errors());
}

#[test]
fn plain_rendering_without_source() {
    let mut diags = Diagnostics::new();
    diags.error("unexpected token", range(4, 7)).emit();
    let rendered = diags.printer().render();
    assert_eq!(rendered, "error at 4..7: unexpected token");
}

#[test]
fn annotated_rendering_with_source() {
    let source = "grammar X\nexpr : INT ;\n";
    let mut diags = Diagnostics::new();
    diags.error("missing ';'", range(8, 9)).emit();
    let rendered = diags.printer().source(source).path("X.g4").render();
    assert!(rendered.contains("missing ';'"));
    assert!(rendered.contains("X.g4"));
}
