//! The read / classify / dispatch / write cycle

use anyhow::Result;

use crate::command::{Command, HELP_TEXT};
use crate::session::ModelSession;

/// Supplies user input one line at a time.
pub trait InputSource {
    /// `Ok(None)` signals end of input.
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Receives transcript text.
pub trait OutputSink {
    /// Append `text`. `from_ai` marks responses so the sink can style them.
    fn append(&mut self, text: &str, from_ai: bool) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

/// Whether the loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// What is left to do for a line once the local commands are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Exit,
    /// The caller runs the prompt and appends the response, AI-tagged
    Generate(String),
}

/// Classify `line` and carry out everything that does not need the model.
///
/// With `echo` the line is appended as `"> line"` before anything else.
/// Exit appends `farewell`; clear and help act on `output` directly.
pub fn dispatch_line<O: OutputSink + ?Sized>(
    line: &str,
    output: &mut O,
    echo: bool,
    farewell: &str,
) -> Result<Dispatch> {
    let Some(command) = Command::parse(line) else {
        return Ok(Dispatch::Continue);
    };

    if echo {
        let echoed = line.trim_end_matches(['\n', '\r']);
        output.append(&format!("> {}", echoed), false)?;
    }

    match command {
        Command::Exit => {
            output.append(farewell, false)?;
            Ok(Dispatch::Exit)
        }
        Command::Clear => {
            output.clear()?;
            Ok(Dispatch::Continue)
        }
        Command::Help => {
            output.append(HELP_TEXT, true)?;
            Ok(Dispatch::Continue)
        }
        Command::Generate(prompt) => Ok(Dispatch::Generate(prompt)),
    }
}

pub struct InteractionLoop<'s, I, O> {
    session: &'s mut ModelSession,
    input: I,
    output: O,
    farewell: String,
    echo_input: bool,
}

impl<'s, I: InputSource, O: OutputSink> InteractionLoop<'s, I, O> {
    pub fn new(session: &'s mut ModelSession, input: I, output: O) -> Self {
        Self {
            session,
            input,
            output,
            farewell: "Goodbye!".to_string(),
            echo_input: false,
        }
    }

    pub fn farewell(mut self, farewell: impl Into<String>) -> Self {
        self.farewell = farewell.into();
        self
    }

    /// Echo each input line as `"> line"` before handling it
    pub fn echo_input(mut self, echo: bool) -> Self {
        self.echo_input = echo;
        self
    }

    /// Run until an exit command or the end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let flow = match self.input.next_line()? {
                Some(line) => self.handle_line(&line)?,
                None => {
                    tracing::debug!("End of input");
                    self.output.append(&self.farewell, false)?;
                    Flow::Exit
                }
            };
            if flow == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Handle one raw input line.
    pub fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match dispatch_line(line, &mut self.output, self.echo_input, &self.farewell)? {
            Dispatch::Continue => Ok(Flow::Continue),
            Dispatch::Exit => Ok(Flow::Exit),
            Dispatch::Generate(prompt) => {
                let response = self.session.generate(&prompt);
                self.output.append(&response, true)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        lines: Vec<(String, bool)>,
        clears: usize,
    }

    impl OutputSink for Recorder {
        fn append(&mut self, text: &str, from_ai: bool) -> Result<()> {
            self.lines.push((text.to_string(), from_ai));
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.clears += 1;
            self.lines.clear();
            Ok(())
        }
    }

    struct NoInput;

    impl InputSource for NoInput {
        fn next_line(&mut self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn handle_line_reports_flow() {
        let mut session = ModelSession::new();
        let mut lp = InteractionLoop::new(&mut session, NoInput, Recorder::default());

        assert_eq!(lp.handle_line("").unwrap(), Flow::Continue);
        assert_eq!(lp.handle_line("help").unwrap(), Flow::Continue);
        assert_eq!(lp.handle_line("QUIT").unwrap(), Flow::Exit);
    }

    #[test]
    fn echo_precedes_dispatch() {
        let mut session = ModelSession::new();
        let mut lp = InteractionLoop::new(&mut session, NoInput, Recorder::default())
            .echo_input(true);

        lp.handle_line("hi\n").unwrap();
        assert_eq!(
            lp.output().lines,
            vec![
                ("> hi".to_string(), false),
                ("[Model not loaded]".to_string(), true),
            ]
        );
    }

    #[test]
    fn clear_is_echoed_then_cleared() {
        let mut session = ModelSession::new();
        let mut lp = InteractionLoop::new(&mut session, NoInput, Recorder::default())
            .echo_input(true);

        lp.handle_line("clear").unwrap();
        let out = lp.into_output();
        assert_eq!(out.clears, 1);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn dispatch_leaves_prompts_to_the_caller() {
        let mut out = Recorder::default();

        assert_eq!(
            dispatch_line("tell me\n", &mut out, true, "Bye").unwrap(),
            Dispatch::Generate("tell me".to_string())
        );
        assert_eq!(dispatch_line("EXIT", &mut out, false, "Bye").unwrap(), Dispatch::Exit);
        assert_eq!(dispatch_line("", &mut out, true, "Bye").unwrap(), Dispatch::Continue);
        assert_eq!(
            out.lines,
            vec![("> tell me".to_string(), false), ("Bye".to_string(), false)]
        );
    }

    #[test]
    fn end_of_input_says_farewell() {
        let mut session = ModelSession::new();
        let mut lp = InteractionLoop::new(&mut session, NoInput, Recorder::default())
            .farewell("See you");

        lp.run().unwrap();
        assert_eq!(lp.output().lines, vec![("See you".to_string(), false)]);
    }
}
