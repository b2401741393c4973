//! Plain-text rendering of LSP snippet bodies.
//!
//! Only what is needed to show a snippet as a completion word: tabstops
//! vanish, placeholders keep their default text, choices keep their first
//! option and variables keep their default (or nothing). Expansion proper is
//! left to the configured snippet engine.

/// Renders `body` the way it reads once every field takes its default.
pub fn render_plain(body: &str) -> String {
	let chars: Vec<char> = body.chars().collect();
	let mut out = String::with_capacity(body.len());
	let mut pos = 0;
	render_until(&chars, &mut pos, &mut out, false);
	out
}

fn render_until(chars: &[char], pos: &mut usize, out: &mut String, nested: bool) {
	while let Some(&ch) = chars.get(*pos) {
		match ch {
			'\\' if chars.get(*pos + 1).is_some_and(|next| matches!(next, '$' | '}' | '\\')) => {
				out.push(chars[*pos + 1]);
				*pos += 2;
			}
			'}' if nested => {
				*pos += 1;
				return;
			}
			'$' => {
				*pos += 1;
				render_dollar(chars, pos, out);
			}
			_ => {
				out.push(ch);
				*pos += 1;
			}
		}
	}
}

fn is_name_char(ch: char) -> bool {
	ch.is_ascii_alphanumeric() || ch == '_'
}

fn render_dollar(chars: &[char], pos: &mut usize, out: &mut String) {
	match chars.get(*pos) {
		Some(ch) if is_name_char(*ch) => {
			while chars.get(*pos).is_some_and(|ch| is_name_char(*ch)) {
				*pos += 1;
			}
		}
		Some('{') => {
			let start = *pos + 1;
			let mut end = start;
			while chars.get(end).is_some_and(|ch| is_name_char(*ch)) {
				end += 1;
			}
			if end == start {
				out.push('$');
				return;
			}
			*pos = end;
			match chars.get(*pos) {
				Some(':') => {
					*pos += 1;
					render_until(chars, pos, out, true);
				}
				Some('|') => {
					*pos += 1;
					render_choice(chars, pos, out);
				}
				Some('}') => *pos += 1,
				_ => skip_field(chars, pos),
			}
		}
		_ => out.push('$'),
	}
}

/// `${1|one,two|}`: keeps `one`.
fn render_choice(chars: &[char], pos: &mut usize, out: &mut String) {
	let mut first = true;
	while let Some(&ch) = chars.get(*pos) {
		match ch {
			'\\' if chars.get(*pos + 1).is_some() => {
				if first {
					out.push(chars[*pos + 1]);
				}
				*pos += 2;
			}
			',' => {
				first = false;
				*pos += 1;
			}
			'|' if chars.get(*pos + 1) == Some(&'}') => {
				*pos += 2;
				return;
			}
			_ => {
				if first {
					out.push(ch);
				}
				*pos += 1;
			}
		}
	}
}

/// Skips a transform or malformed field up to its closing brace.
fn skip_field(chars: &[char], pos: &mut usize) {
	let mut depth = 0usize;
	while let Some(&ch) = chars.get(*pos) {
		*pos += 1;
		match ch {
			'\\' => *pos += 1,
			'{' => depth += 1,
			'}' if depth == 0 => return,
			'}' => depth -= 1,
			_ => {}
		}
	}
}
