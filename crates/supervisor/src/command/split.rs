use std::{iter::repeat, mem::take};

/// Split a command-line string into arguments the way Windows programs do.
///
/// Argument strings are written for the Microsoft C runtime's parser, so this applies its rules
/// when a platform wants an argv instead of a raw command line:
///
/// - spaces and tabs outside quotes separate arguments;
/// - `"` toggles quoting, and `""` inside quotes is a literal quote;
/// - backslashes are literal unless they precede a quote, in which case each pair becomes one
///   backslash and an odd one out escapes the quote.
#[must_use]
pub fn split_command_line(line: &str) -> Vec<String> {
	let mut args = Vec::new();
	let mut current = String::new();
	let mut in_arg = false;
	let mut quoted = false;
	let mut chars = line.chars().peekable();

	while let Some(c) = chars.next() {
		match c {
			'\\' => {
				in_arg = true;
				let mut count = 1;
				while chars.peek() == Some(&'\\') {
					chars.next();
					count += 1;
				}

				if chars.peek() == Some(&'"') {
					current.extend(repeat('\\').take(count / 2));
					if count % 2 == 1 {
						chars.next();
						current.push('"');
					}
				} else {
					current.extend(repeat('\\').take(count));
				}
			}
			'"' => {
				in_arg = true;
				if quoted && chars.peek() == Some(&'"') {
					chars.next();
					current.push('"');
				} else {
					quoted = !quoted;
				}
			}
			' ' | '\t' if !quoted => {
				if in_arg {
					args.push(take(&mut current));
					in_arg = false;
				}
			}
			c => {
				in_arg = true;
				current.push(c);
			}
		}
	}

	if in_arg {
		args.push(current);
	}

	args
}
