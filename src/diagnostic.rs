use owo_colors::OwoColorize;

/// A source span representing a range of bytes in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Byte offsets of every line start, for offset -> (line, column) lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            starts,
            len: source.len(),
        }
    }

    /// 1-based line containing `offset`.
    pub fn line(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset.min(self.len)) {
            Ok(exact) => exact + 1,
            Err(next) => next,
        }
    }

    /// 1-based (line, column) for `offset`. Columns count bytes.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        let col = offset.min(self.len) - self.starts[line - 1] + 1;
        (line, col)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    fn line_text<'s>(&self, source: &'s str, line: usize) -> Option<&'s str> {
        let start = *self.starts.get(line.checked_sub(1)?)?;
        let end = self
            .starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(source.len());
        source.get(start..end).map(|text| text.trim_end_matches('\r'))
    }
}

/// A label pointing to a specific span in the source
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// A structured error record: the line it happened on, optional location
/// context (`at end`, `at 'x'`), and a message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<String>,
    pub line: usize,
    pub location: Option<String>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Self {
            code: None,
            line,
            location: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.notes.push(format!("help: {}", help.into()));
        self
    }

    /// One-line form: `[line N] Error at 'x': message`.
    pub fn summary(&self) -> String {
        match &self.location {
            Some(location) => format!("[line {}] Error {}: {}", self.line, location, self.message),
            None => format!("[line {}] Error: {}", self.line, self.message),
        }
    }
}

/// Diagnostic renderer for rustc-like error output
pub struct DiagnosticRenderer<'a> {
    source: &'a str,
    file_name: &'a str,
    use_color: bool,
    lines: LineIndex,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(source: &'a str, file_name: &'a str, use_color: bool) -> Self {
        Self {
            source,
            file_name,
            use_color,
            lines: LineIndex::new(source),
        }
    }

    /// Render a diagnostic to a string
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        self.render_header(&mut output, diagnostic);

        let mut lines_to_show: Vec<usize> = Vec::new();
        for label in &diagnostic.labels {
            let start_line = self.lines.line(label.span.start);
            let end_line = self.lines.line(label.span.end.saturating_sub(1).max(label.span.start));
            for line in start_line..=end_line {
                if !lines_to_show.contains(&line) {
                    lines_to_show.push(line);
                }
            }
        }
        lines_to_show.sort_unstable();

        match diagnostic.labels.first() {
            Some(label) => {
                let (line, col) = self.lines.line_col(label.span.start);
                output.push_str(&format!("  {} {}:{}:{}\n", self.style_blue("-->"), self.file_name, line, col));
            }
            None if diagnostic.line == 0 => {
                output.push_str(&format!("  {} {}\n", self.style_blue("-->"), self.file_name));
            }
            None => {
                output.push_str(&format!("  {} {}:{}\n", self.style_blue("-->"), self.file_name, diagnostic.line));
            }
        }

        if !lines_to_show.is_empty() {
            let max_line = lines_to_show.last().copied().unwrap_or(1);
            let width = max_line.to_string().len();

            output.push_str(&format!("{} {}\n", " ".repeat(width + 1), self.style_blue("|")));
            for &line_num in &lines_to_show {
                self.render_line(&mut output, diagnostic, line_num, width);
            }
            output.push_str(&format!("{} {}\n", " ".repeat(width + 1), self.style_blue("|")));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("  {} {}\n", self.style_blue("="), note));
        }

        output
    }

    fn render_header(&self, output: &mut String, diagnostic: &Diagnostic) {
        let severity = self.style_red_bold("error");
        let message = match &diagnostic.location {
            Some(location) => format!("{}: {}", location, diagnostic.message),
            None => diagnostic.message.clone(),
        };

        if let Some(code) = &diagnostic.code {
            output.push_str(&format!("{}[{}]: {}\n", severity, code, self.style_bold(&message)));
        } else {
            output.push_str(&format!("{}: {}\n", severity, self.style_bold(&message)));
        }
    }

    fn render_line(&self, output: &mut String, diagnostic: &Diagnostic, line_num: usize, width: usize) {
        let content = match self.lines.line_text(self.source, line_num) {
            Some(text) => text,
            None => return,
        };

        output.push_str(&format!(
            "{:>width$} {} {}\n",
            self.style_blue(&line_num.to_string()),
            self.style_blue("|"),
            content,
            width = width + 1
        ));

        let mut underlines: Vec<(usize, usize, &str)> = Vec::new();
        for label in &diagnostic.labels {
            let (start_line, start_col) = self.lines.line_col(label.span.start);
            let (end_line, end_col) = self.lines.line_col(label.span.end.saturating_sub(1).max(label.span.start));

            if start_line <= line_num && end_line >= line_num {
                let col_start = if start_line == line_num { start_col } else { 1 };
                let col_end = if end_line == line_num { end_col + 1 } else { content.len() + 1 };
                underlines.push((col_start, col_end.max(col_start + 1), &label.message));
            }
        }

        if underlines.is_empty() {
            return;
        }

        underlines.sort_by_key(|(start, _, _)| *start);

        let mut underline = String::new();
        let mut pos = 1;
        for (col_start, col_end, _) in &underlines {
            while pos < *col_start {
                underline.push(' ');
                pos += 1;
            }
            while pos < *col_end {
                underline.push('^');
                pos += 1;
            }
        }

        output.push_str(&format!(
            "{} {} {}\n",
            " ".repeat(width + 1),
            self.style_blue("|"),
            self.style_red(&underline)
        ));

        for (col_start, _, message) in &underlines {
            if !message.is_empty() {
                output.push_str(&format!(
                    "{} {} {}{}\n",
                    " ".repeat(width + 1),
                    self.style_blue("|"),
                    " ".repeat(col_start.saturating_sub(1)),
                    self.style_red(message)
                ));
            }
        }
    }

    fn style_red(&self, s: &str) -> String {
        if self.use_color {
            s.red().to_string()
        } else {
            s.to_string()
        }
    }

    fn style_red_bold(&self, s: &str) -> String {
        if self.use_color {
            s.red().bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn style_blue(&self, s: &str) -> String {
        if self.use_color {
            s.blue().to_string()
        } else {
            s.to_string()
        }
    }

    fn style_bold(&self, s: &str) -> String {
        if self.use_color {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }
}

/// Render multiple diagnostics followed by an abort summary.
pub fn render_diagnostics(source: &str, file_name: &str, diagnostics: &[Diagnostic], use_color: bool) -> String {
    let renderer = DiagnosticRenderer::new(source, file_name, use_color);
    let mut output = String::new();

    for diagnostic in diagnostics {
        output.push_str(&renderer.render(diagnostic));
        output.push('\n');
    }

    let error_count = diagnostics.len();
    if error_count > 0 {
        output.push_str(&format!(
            "error: aborting due to {} error{}\n",
            error_count,
            if error_count == 1 { "" } else { "s" }
        ));
    }

    output
}
