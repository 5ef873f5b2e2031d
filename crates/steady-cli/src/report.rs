use ariadne::{Config, Label, Report, ReportKind, Source};
use steady_macro::{MacroError, UsageErrorKind};
use steady_template::SourceLocation;

/// Render a transform failure as a plain-text code frame pointing into `source`.
///
/// Errors without a position (codegen, unlocated syntax errors) get a one-line report.
pub fn render(filename: &str, source: &str, error: &MacroError) -> String {
    let Some(span) = error.span().filter(|s| !s.is_synthetic()) else {
        return format!("error: {filename}: {error}\n");
    };
    let start = (span.start as usize).min(source.len());
    let end = (span.end as usize).clamp(start, source.len());
    let location = SourceLocation::locate(source, start as u32);
    let range = char_offset(source, start)..char_offset(source, end);

    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(format!("{filename}:{location}: {error}"))
        .with_label(Label::new((filename, range)).with_message(label(error)))
        .finish()
        .write((filename, Source::from(source)), &mut buf);

    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("error: {filename}:{location}: {error}\n"),
    }
}

fn char_offset(source: &str, byte: usize) -> usize {
    source
        .get(..byte)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(byte)
}

fn label(error: &MacroError) -> &'static str {
    let MacroError::Usage(usage) = error else {
        return "here";
    };
    match usage.kind {
        UsageErrorKind::MissingTarget => "add an `as` attribute",
        UsageErrorKind::UnsupportedTarget => "must be a string or a component name",
        UsageErrorKind::DuplicateTarget => "second `as` attribute",
        UsageErrorKind::NotAnElement => "used as a value",
        UsageErrorKind::HandlerNotExpression => "expected {expression}",
        UsageErrorKind::DynamicAnchorId => "computed id",
        UsageErrorKind::UnknownMacro => "not a macro export",
    }
}
