use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    // `[...]` content, brackets dropped
    FixedBlock(String),
    DigitCounter { start: u64, width: usize },
    SharedCounter { width: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
    #[error("template has '[' at position {position} without a matching ']'")]
    UnmatchedBracket { position: usize },
    #[error("digit run is too large to use as a counter: {digits}")]
    NumberTooLarge { digits: String },
    #[error("template may not contain {ch:?}; names stay inside the folder")]
    InvalidCharacter { ch: char },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_counter(&self) -> bool {
        self.segments.iter().any(|segment| {
            matches!(
                segment,
                Segment::DigitCounter { .. } | Segment::SharedCounter { .. }
            )
        })
    }

    pub fn render(&self, shared_start: u64, index: u64) -> String {
        render_name(&self.segments, shared_start, index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Bracket,
    Shared,
    Digit,
    Literal,
}

fn classify(ch: char) -> CharClass {
    match ch {
        '[' => CharClass::Bracket,
        'x' => CharClass::Shared,
        '0'..='9' => CharClass::Digit,
        _ => CharClass::Literal,
    }
}

pub fn compile_template(input: &str) -> Result<Template, TemplateError> {
    if input.is_empty() {
        return Err(TemplateError::Empty);
    }
    if let Some(ch) = input.chars().find(|&ch| matches!(ch, '/' | '\\' | '\0')) {
        return Err(TemplateError::InvalidCharacter { ch });
    }

    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let class = classify(chars[pos]);

        if class == CharClass::Bracket {
            let close = chars[pos + 1..]
                .iter()
                .position(|&ch| ch == ']')
                .map(|offset| pos + 1 + offset)
                .ok_or(TemplateError::UnmatchedBracket { position: pos })?;
            segments.push(Segment::FixedBlock(chars[pos + 1..close].iter().collect()));
            pos = close + 1;
            continue;
        }

        let mut end = pos + 1;
        while end < chars.len() && classify(chars[end]) == class {
            end += 1;
        }
        let run: String = chars[pos..end].iter().collect();
        let width = end - pos;

        let segment = match class {
            CharClass::Shared => Segment::SharedCounter { width },
            CharClass::Digit => {
                let start = run
                    .parse::<u64>()
                    .map_err(|_| TemplateError::NumberTooLarge {
                        digits: run.clone(),
                    })?;
                Segment::DigitCounter { start, width }
            }
            _ => Segment::Literal(run),
        };
        segments.push(segment);
        pos = end;
    }

    Ok(Template {
        source: input.to_string(),
        segments,
    })
}

/// Renders the base name for the `index`-th file. Pure in all arguments, so
/// the shared counter is just `shared_start + index` for every `x` run.
pub fn render_name(segments: &[Segment], shared_start: u64, index: u64) -> String {
    let shared = shared_start.saturating_add(index);
    let mut output = String::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) | Segment::FixedBlock(text) => output.push_str(text),
            Segment::DigitCounter { start, width } => {
                push_padded(&mut output, start.saturating_add(index), *width)
            }
            Segment::SharedCounter { width } => push_padded(&mut output, shared, *width),
        }
    }

    output
}

// Width pads, it never clips.
fn push_padded(output: &mut String, value: u64, width: usize) {
    output.push_str(&format!("{:0width$}", value, width = width));
}
