//! Reader for the line-oriented instance format:
//!
//! ```text
//! num_bins
//! capacity            (num_bins lines)
//! num_items
//! weight value reference   (num_items lines)
//! ```
//!
//! Blank lines are skipped wherever they appear. Errors point at the
//! physical line of the file.

use crate::error::{AllocError, MalformedInstance};
use crate::types::{Instance, Item};
use log::debug;
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;

pub fn load_instance(path: impl AsRef<Path>) -> Result<Instance, AllocError> {
    let path = path.as_ref();
    let text = read_to_string(path).map_err(|source| AllocError::InstanceNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let instance = parse_instance(&text).map_err(|source| AllocError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "loaded {}: {} items, {} bins",
        path.display(),
        instance.num_items(),
        instance.num_bins()
    );
    Ok(instance)
}

pub fn parse_instance(text: &str) -> Result<Instance, MalformedInstance> {
    let mut lines = non_blank_lines(text);

    let num_bins: usize = lines.number("number of bins")?;
    let capacities = (1..=num_bins)
        .map(|bin| lines.number(&format!("capacity of bin {bin}")))
        .collect::<Result<Vec<u64>, _>>()?;

    let num_items: usize = lines.number("number of items")?;
    let items = (0..num_items)
        .map(|item| lines.item(item))
        .collect::<Result<Vec<Item>, _>>()?;

    Ok(Instance::new(capacities, items))
}

impl FromStr for Instance {
    type Err = MalformedInstance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_instance(s)
    }
}

/// Non-blank, trimmed lines paired with their 1-based line number.
struct Lines<I> {
    inner: I,
}

fn non_blank_lines(text: &str) -> Lines<impl Iterator<Item = (usize, &str)>> {
    let inner = text
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());
    Lines { inner }
}

impl<'a, I> Lines<I>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    fn next_line(&mut self, field: &str) -> Result<(usize, &'a str), MalformedInstance> {
        self.inner.next().ok_or_else(|| MalformedInstance::Missing {
            field: field.to_owned(),
        })
    }

    fn number<T: FromStr>(&mut self, field: &str) -> Result<T, MalformedInstance> {
        let (line, text) = self.next_line(field)?;
        parse_field(line, field, text)
    }

    fn item(&mut self, item: usize) -> Result<Item, MalformedInstance> {
        let (line, text) = self.next_line(&format!("item {item}"))?;
        let fields: Vec<&str> = text.split_whitespace().collect();
        let &[weight, value, reference] = fields.as_slice() else {
            return Err(MalformedInstance::FieldCount {
                line,
                found: fields.len(),
            });
        };
        Ok(Item {
            weight: parse_field(line, &format!("weight of item {item}"), weight)?,
            value: parse_field(line, &format!("value of item {item}"), value)?,
            reference: parse_field(line, &format!("reference of item {item}"), reference)?,
        })
    }
}

fn parse_field<T: FromStr>(line: usize, field: &str, text: &str) -> Result<T, MalformedInstance> {
    text.parse().map_err(|_| MalformedInstance::NotANumber {
        line,
        field: field.to_owned(),
        text: text.to_owned(),
    })
}
