//! Argument formatting for `$display` and friends.

use cascade_core::bits::Bits;

/// An evaluated system task argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Str(String),
    Value(Bits),
}

impl FormatArg {
    fn decimal(&self) -> String {
        match self {
            FormatArg::Str(s) => s.clone(),
            FormatArg::Value(b) => b.to_string_radix(10),
        }
    }
}

fn radix_text(arg: &FormatArg, radix: u32) -> String {
    match arg {
        FormatArg::Str(s) => s.clone(),
        FormatArg::Value(b) => b.clone().with_signed(false).to_string_radix(radix),
    }
}

/// Render task arguments. A leading string is a format string; any other
/// argument list prints every argument in decimal.
pub fn format(args: &[FormatArg]) -> String {
    let Some((first, rest)) = args.split_first() else {
        return String::new();
    };
    let FormatArg::Str(fmt) = first else {
        return args.iter().map(FormatArg::decimal).collect();
    };

    let mut out = String::new();
    let mut rest = rest.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        // Field widths such as `%0d` are accepted and ignored.
        while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
            chars.next();
        }
        let Some(spec) = chars.next() else {
            out.push('%');
            break;
        };
        let spec = spec.to_ascii_lowercase();
        if spec == '%' {
            out.push('%');
            continue;
        }
        let radix = match spec {
            'b' => Some(2),
            'o' => Some(8),
            'd' | 't' => Some(10),
            'h' | 'x' => Some(16),
            's' | 'c' => None,
            other => {
                out.push('%');
                out.push(other);
                continue;
            }
        };
        let Some(arg) = rest.next() else {
            continue;
        };
        match (spec, radix) {
            (_, Some(10)) => out.push_str(&arg.decimal()),
            (_, Some(r)) => out.push_str(&radix_text(arg, r)),
            ('s', None) => match arg {
                FormatArg::Str(s) => out.push_str(s),
                FormatArg::Value(b) => out.push_str(&b.to_ascii()),
            },
            (_, None) => match arg {
                FormatArg::Str(s) => out.extend(s.chars().next()),
                FormatArg::Value(b) => out.push(char::from(b.to_u64() as u8)),
            },
        }
    }
    for arg in rest {
        out.push_str(&arg.decimal());
    }
    out
}
