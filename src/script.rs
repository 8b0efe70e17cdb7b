
use std::fmt::{self, Write};
use std::fs;
use std::path::Path;

use serde_json::Value;


/// An ImageJ macro, built from typed statements and only turned into text at the very end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
	statements: Vec<Statement>
}

impl Script {

	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, statement: Statement) -> &mut Self {
		self.statements.push(statement);
		self
	}

	pub fn write(&self, path: impl AsRef<Path>) -> Result<(),std::io::Error> {
		fs::write(path, self.to_string())
	}
}

impl fmt::Display for Script {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for statement in &self.statements {
			statement.render(f)?;
		}
		Ok(())
	}
}


#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
	Blank,
	Comment(String),
	Print(Vec<Expr>),
	Open(String),
	/// stop the macro if no image is open
	RequireImages,
	Run {
		command: String,
		options: Option<RunOptions>
	},
	/// save the first open image whose title contains any of the markers
	SaveFirstTitled {
		markers: Vec<String>,
		format: String,
		path: String
	},
	CloseAll
}

impl Statement {

	pub fn comment(text: impl Into<String>) -> Self {
		Statement::Comment(text.into())
	}

	pub fn print(text: impl Into<String>) -> Self {
		Statement::Print(vec![Expr::Text(text.into())])
	}

	pub fn run(command: impl Into<String>, options: RunOptions) -> Self {
		Statement::Run {
			command: command.into(),
			options: Some(options)
		}
	}

	fn render(&self, out: &mut impl Write) -> fmt::Result {
		match self {

			Statement::Blank => writeln!(out),

			Statement::Comment(text) => {
				// a newline would end the comment early
				for line in text.lines() {
					writeln!(out, "// {}", line)?;
				}
				Ok(())
			}

			Statement::Print(parts) => writeln!(out, "print({});", render_concat(parts)),

			Statement::Open(path) => writeln!(out, "open({});", quote(path)),

			Statement::RequireImages => {
				writeln!(out, "if (nImages == 0) {{")?;
				writeln!(out, "\tprint({});", quote("Error: No images are open!"))?;
				writeln!(out, "\texit();")?;
				writeln!(out, "}}")
			}

			Statement::Run { command, options: None } =>
				writeln!(out, "run({});", quote(command)),

			Statement::Run { command, options: Some(options) } =>
				writeln!(out, "run({}, {});", quote(command), quote(&options.to_string())),

			Statement::SaveFirstTitled { markers, format, path } => {
				let condition = markers.iter()
					.map(|marker| format!("indexOf(title, {}) >= 0", quote(marker)))
					.collect::<Vec<_>>()
					.join(" || ");
				writeln!(out, "for (i = 1; i <= nImages; i++) {{")?;
				writeln!(out, "\tselectImage(i);")?;
				writeln!(out, "\ttitle = getTitle();")?;
				writeln!(out, "\tif ({}) {{", if condition.is_empty() { "false" } else { condition.as_str() })?;
				writeln!(out, "\t\tsaveAs({}, {});", quote(format), quote(path))?;
				writeln!(out, "\t\tprint({});", quote(&format!("Saved image: {}", path)))?;
				writeln!(out, "\t\tbreak;")?;
				writeln!(out, "\t}}")?;
				writeln!(out, "}}")
			}

			Statement::CloseAll => writeln!(out, "run({});", quote("Close All"))
		}
	}
}


#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Text(String),
	/// a call to a built-in macro function with no arguments, eg getVersion
	Call(String)
}

fn render_concat(parts: &[Expr]) -> String {
	if parts.is_empty() {
		return quote("");
	}
	parts.iter()
		.map(|part| match part {
			Expr::Text(text) => quote(text),
			Expr::Call(name) => format!("{}()", name)
		})
		.collect::<Vec<_>>()
		.join(" + ")
}


/// Renders a string literal for the ImageJ macro language.
pub fn quote(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + 2);
	out.push('"');
	for c in text.chars() {
		match c {
			'\\' => out.push_str("\\\\"),
			'"' => out.push_str("\\\""),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			c => out.push(c)
		}
	}
	out.push('"');
	out
}


/// The `key=value` option string passed to a `run` statement, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
	args: Vec<(String,Value)>
}

impl RunOptions {

	pub fn new() -> Self {
		Self::default()
	}

	pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.args.push((key.into(), value.into()));
		self
	}
}

impl fmt::Display for RunOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (key, value)) in self.args.iter().enumerate() {
			if i > 0 {
				f.write_char(' ')?;
			}
			write!(f, "{}={}", key, render_option_value(value))?;
		}
		Ok(())
	}
}


fn render_option_value(value: &Value) -> String {
	match value {
		Value::String(text) => {
			// the option syntax has no escapes, so brackets can't appear inside a bracketed value
			let text = text.replace('[', "(").replace(']', ")");
			if text.is_empty() || text.chars().any(char::is_whitespace) {
				format!("[{}]", text)
			} else {
				text
			}
		}
		Value::Null => "[]".to_string(),
		other => other.to_string()
	}
}
