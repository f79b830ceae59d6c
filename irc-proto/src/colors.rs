//! An extension trait that strips mIRC formatting codes from message text.
use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const HEX_COLOR: char = '\x04';
const RESET: char = '\x0F';
const MONOSPACE: char = '\x11';
const REVERSE: char = '\x16';
const ITALIC: char = '\x1D';
const STRIKETHROUGH: char = '\x1E';
const UNDERLINE: char = '\x1F';

/// An extension trait giving strings a function to strip IRC formatting.
pub trait FormattedStringExt {
    /// Returns true if the string contains any color or style control code.
    fn is_formatted(&self) -> bool;

    /// Returns the string with every color and style control code removed.
    fn strip_formatting(&self) -> Cow<str>;
}

fn is_control(c: char) -> bool {
    matches!(
        c,
        BOLD | COLOR | HEX_COLOR | RESET | MONOSPACE | REVERSE | ITALIC | STRIKETHROUGH | UNDERLINE
    )
}

/// Consumes up to `max` characters matching `pred`, returning how many were taken.
fn skip_while_max<F>(chars: &mut Peekable<Chars>, max: usize, pred: F) -> usize
where
    F: Fn(char) -> bool,
{
    let mut taken = 0;
    while taken < max {
        match chars.peek() {
            Some(&c) if pred(c) => {
                chars.next();
                taken += 1;
            }
            _ => break,
        }
    }
    taken
}

/// Skips a `fg[,bg]` color argument. A comma is only part of the code when a background
/// digit follows it.
fn skip_color_args<F>(chars: &mut Peekable<Chars>, width: usize, digit: F)
where
    F: Fn(char) -> bool + Copy,
{
    if skip_while_max(chars, width, digit) == 0 {
        return;
    }
    if chars.peek() != Some(&',') {
        return;
    }
    let mut lookahead = chars.clone();
    lookahead.next();
    if matches!(lookahead.peek(), Some(&c) if digit(c)) {
        chars.next();
        skip_while_max(chars, width, digit);
    }
}

impl FormattedStringExt for str {
    fn is_formatted(&self) -> bool {
        self.chars().any(is_control)
    }

    fn strip_formatting(&self) -> Cow<str> {
        if !self.is_formatted() {
            return Cow::Borrowed(self);
        }

        let mut out = String::with_capacity(self.len());
        let mut chars = self.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                COLOR => skip_color_args(&mut chars, 2, |c| c.is_ascii_digit()),
                HEX_COLOR => skip_color_args(&mut chars, 6, |c| c.is_ascii_hexdigit()),
                c if is_control(c) => {}
                c => out.push(c),
            }
        }
        Cow::Owned(out)
    }
}

impl FormattedStringExt for String {
    fn is_formatted(&self) -> bool {
        self.as_str().is_formatted()
    }

    fn strip_formatting(&self) -> Cow<str> {
        self.as_str().strip_formatting()
    }
}
