//! Terminal playback of one lesson session.
//!
//! Each input line is one command. Question, slot and blank numbers are
//! 1-based as printed.

use std::fmt::Write as _;
use std::io::{BufRead, Write};

use anyhow::{bail, Context};
use codepath_engine::content::{BlankKind, CodeSnippet, TemplateSegment};
use codepath_engine::evaluate::mcq::OptionMark;
use codepath_engine::evaluate::rearrange::SlotVerdict;
use codepath_engine::session::BlockView;
use codepath_engine::{Action, LessonKind, LessonSession, QuestionView, SessionView};
use codepath_render::code::CodeBlock;
use codepath_render::diagram::extract_labels;
use codepath_render::Theme;

const HELP: &str = "\
Commands:
  next | prev | goto N      move between questions
  read                      mark a concept section as read
  select ID                 choose an option
  blank N TEXT              fill blank N
  place ID | unplace N      move a block into or out of the answer
  move A B                  reorder placed blocks
  hint | solution           rearrangement help
  check | reset             submit or start the question over
  progress | help | quit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply an action to the session.
    Apply(Action),
    /// Print progress.
    Progress,
    /// Print the command list.
    Help,
    /// Leave the lesson.
    Quit,
}

/// Parses one input line.
pub fn parse_command(line: &str) -> anyhow::Result<Command> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    let action = match name.to_ascii_lowercase().as_str() {
        "next" | "n" => Action::Next,
        "prev" | "previous" | "p" => Action::Previous,
        "goto" => Action::GoTo {
            index: one_based(rest, "question")?,
        },
        "read" => Action::MarkRead,
        "select" | "s" => Action::Select {
            option: required(rest, "option id")?.to_string(),
        },
        "blank" | "b" => {
            let (position, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let position = position
                .parse::<u32>()
                .with_context(|| format!("invalid blank number '{position}'"))?;
            Action::SetBlank {
                position,
                value: value.trim_start().to_string(),
            }
        }
        "place" => Action::Place {
            block: required(rest, "block id")?.to_string(),
        },
        "unplace" => Action::Unplace {
            slot: one_based(rest, "slot")?,
        },
        "move" => {
            let mut parts = rest.split_whitespace();
            let from = one_based(parts.next().unwrap_or(""), "slot")?;
            let to = one_based(parts.next().unwrap_or(""), "slot")?;
            Action::Move { from, to }
        }
        "hint" => Action::ShowHint,
        "solution" => Action::ShowSolution,
        "check" | "c" => Action::Check,
        "reset" => Action::Reset,
        "progress" => return Ok(Command::Progress),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" | "q" => return Ok(Command::Quit),
        "" => bail!("empty command"),
        other => bail!("unknown command '{other}' (type 'help')"),
    };
    Ok(Command::Apply(action))
}

fn required<'a>(value: &'a str, what: &str) -> anyhow::Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        bail!("missing {what}");
    }
    Ok(value)
}

fn one_based(value: &str, what: &str) -> anyhow::Result<usize> {
    let number = required(value, what)?
        .parse::<usize>()
        .with_context(|| format!("invalid {what} number '{value}'"))?;
    if number == 0 {
        bail!("{what} numbers start at 1");
    }
    Ok(number - 1)
}

/// Reads commands from `input` until `quit` or end of input.
pub fn run(
    session: &mut LessonSession,
    theme: Theme,
    input: impl BufRead,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    writeln!(output, "{}", render_view(&session.view(), theme))?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => writeln!(output, "{HELP}")?,
            Ok(Command::Progress) => {
                let progress = session.progress();
                writeln!(
                    output,
                    "Progress: {}/{} complete, {} correct ({}%)",
                    progress.completed,
                    progress.total,
                    progress.correct,
                    progress.percent()
                )?;
            }
            Ok(Command::Apply(action)) => match session.apply(action) {
                Ok(()) => writeln!(output, "{}", render_view(&session.view(), theme))?,
                Err(e) => writeln!(output, "! {}", e.user_message())?,
            },
            Err(e) => writeln!(output, "! {e}")?,
        }
    }

    let progress = session.progress();
    writeln!(
        output,
        "Leaving lesson: {}/{} complete",
        progress.completed, progress.total
    )?;
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders the session view as plain text.
pub fn render_view(view: &SessionView, theme: Theme) -> String {
    let mut out = String::new();
    let kind = view.lesson.kind.map_or("unknown", LessonKind::as_str);
    let _ = writeln!(out, "== {} ({kind}) ==", view.lesson.title);

    if let Some(reason) = &view.unavailable {
        let _ = writeln!(out, "This lesson is unavailable: {reason}");
        return out;
    }

    let _ = writeln!(
        out,
        "Question {}/{} | {}/{} complete",
        view.current + 1,
        view.total,
        view.progress.completed,
        view.progress.total
    );

    match &view.question {
        Some(QuestionView::Concept {
            section,
            key_points,
            read,
        }) => {
            let _ = writeln!(out, "\n## {}\n\n{}", section.title, section.content);
            write_code(&mut out, section.code.as_ref(), theme);
            write_diagram(&mut out, section.diagram.as_deref());
            for point in key_points {
                let _ = writeln!(out, "  * {point}");
            }
            let _ = writeln!(out, "{}", if *read { "[read]" } else { "(type 'read' when done)" });
        }
        Some(QuestionView::Mcq {
            scenario,
            diagram,
            code,
            options,
            explanation,
            ..
        }) => {
            let _ = writeln!(out, "\n{scenario}");
            write_code(&mut out, code.as_ref(), theme);
            write_diagram(&mut out, diagram.as_deref());
            for option in options {
                let _ = writeln!(
                    out,
                    "  [{}] {}{}",
                    option.id,
                    option.text,
                    mark_label(option.mark)
                );
                if let Some(text) = &option.explanation {
                    let _ = writeln!(out, "        {text}");
                }
            }
            write_explanation(&mut out, explanation.as_deref());
        }
        Some(QuestionView::FillInBlanks {
            scenario,
            diagram,
            segments,
            blanks,
            result,
            solution,
            explanation,
            ..
        }) => {
            let _ = writeln!(out, "\n{scenario}");
            write_diagram(&mut out, diagram.as_deref());
            let _ = writeln!(out);
            for segment in segments {
                match segment {
                    TemplateSegment::Text { text } => out.push_str(text),
                    TemplateSegment::Blank { position } => {
                        let value = blanks
                            .iter()
                            .find(|b| b.position == *position)
                            .map_or("", |b| b.value.as_str());
                        let shown = if value.is_empty() { "____" } else { value };
                        let _ = write!(out, "[{position}: {shown}]");
                    }
                }
            }
            let _ = writeln!(out);
            for blank in blanks.iter().filter(|b| b.kind == BlankKind::Dropdown) {
                let _ = writeln!(
                    out,
                    "  blank {} choices: {}",
                    blank.position,
                    blank.options.join(" | ")
                );
            }
            if let Some(result) = result {
                let _ = writeln!(
                    out,
                    "Score: {}% ({}/{})",
                    result.score, result.correct_count, result.total
                );
                for verdict in result.blanks.iter().filter(|v| !v.correct) {
                    let _ = write!(
                        out,
                        "  blank {}: expected '{}'",
                        verdict.position, verdict.expected
                    );
                    if let Some(hint) = &verdict.hint {
                        let _ = write!(out, " (hint: {hint})");
                    }
                    let _ = writeln!(out);
                }
            }
            if let Some(solution) = solution {
                let _ = writeln!(out, "Solution:\n{solution}");
            }
            write_explanation(&mut out, explanation.as_deref());
        }
        Some(QuestionView::CodeRearrange {
            scenario,
            diagram,
            pool,
            placed,
            hints,
            hints_remaining,
            result,
            solution,
            explanation,
            ..
        }) => {
            let _ = writeln!(out, "\n{scenario}");
            write_diagram(&mut out, diagram.as_deref());
            let _ = writeln!(out, "Available blocks:");
            write_blocks(&mut out, pool, |block, _| format!("[{}]", block.id));
            let _ = writeln!(out, "Your answer:");
            let verdicts = result.as_ref().map(|r| r.slots.as_slice()).unwrap_or_default();
            write_blocks(&mut out, placed, |_, slot| {
                let verdict = verdicts.get(slot).map_or("", |v| verdict_label(*v));
                format!("{}.{verdict}", slot + 1)
            });
            for hint in hints {
                let _ = writeln!(out, "  hint: {hint}");
            }
            if *hints_remaining > 0 {
                let _ = writeln!(out, "  ({hints_remaining} hint(s) left)");
            }
            if let Some(result) = result {
                let _ = writeln!(out, "{}", if result.correct { "Correct!" } else { "Not quite." });
            }
            if let Some(solution) = solution {
                let _ = writeln!(out, "Solution:");
                write_blocks(&mut out, solution, |_, slot| format!("{}.", slot + 1));
            }
            write_explanation(&mut out, explanation.as_deref());
        }
        None => {}
    }

    if let Some(summary) = &view.summary {
        let _ = writeln!(
            out,
            "\nLesson complete: {}/{} correct",
            summary.progress.correct, summary.progress.total
        );
        if let Some(score) = summary.progress.average_score {
            let _ = writeln!(out, "Average score: {score:.0}%");
        }
    }
    out
}

fn write_code(out: &mut String, code: Option<&CodeSnippet>, theme: Theme) {
    if let Some(snippet) = code {
        let block = CodeBlock::new(snippet.code.clone(), snippet.language.clone(), theme);
        let _ = writeln!(out, "{}", block.to_markdown());
    }
}

fn write_diagram(out: &mut String, diagram: Option<&str>) {
    if let Some(source) = diagram {
        let labels = extract_labels(source);
        if !labels.is_empty() {
            let _ = writeln!(out, "(diagram: {})", labels.join(" -> "));
        }
    }
}

fn write_explanation(out: &mut String, explanation: Option<&str>) {
    if let Some(text) = explanation {
        let _ = writeln!(out, "\n{text}");
    }
}

fn write_blocks(
    out: &mut String,
    blocks: &[BlockView],
    label: impl Fn(&BlockView, usize) -> String,
) {
    if blocks.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for (slot, block) in blocks.iter().enumerate() {
        let mut lines = block.code.lines();
        let _ = writeln!(out, "  {:>6} {}", label(block, slot), lines.next().unwrap_or(""));
        for line in lines {
            let _ = writeln!(out, "         {line}");
        }
    }
}

const fn mark_label(mark: OptionMark) -> &'static str {
    match mark {
        OptionMark::Neutral => "",
        OptionMark::Correct => "  <- correct answer",
        OptionMark::SelectedCorrect => "  <- your answer, correct",
        OptionMark::SelectedWrong => "  <- your answer, incorrect",
    }
}

const fn verdict_label(verdict: SlotVerdict) -> &'static str {
    match verdict {
        SlotVerdict::Correct => "ok",
        SlotVerdict::Incorrect => "x",
        SlotVerdict::Missing => "?",
        SlotVerdict::Extra => "+",
    }
}
