//! Rad blocks: fetch, capture, modify, sort and display columns.

use log::debug;
use regex::Regex;

use crate::attr::Attr;
use crate::error::RadError;
use crate::richstr::RichStr;

use super::ast::{FieldMod, RadBlock, RadKind, SortSpec};
use super::func::CallArgs;
use super::interp::Interpreter;
use super::sort::{general_rules, sort_columns, SortRule};
use super::trie::bind_fields;
use super::value::{List, Value};

/// Turns a table into output lines.
pub trait TableRenderer {
    fn render(&mut self, headers: &[String], rows: &[Vec<Value>], color: bool) -> Vec<String>;
}

/// Left-aligned columns separated by two spaces, header first.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRenderer;

impl TableRenderer for PlainRenderer {
    fn render(&mut self, headers: &[String], rows: &[Vec<Value>], color: bool) -> Vec<String> {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        let cells: Vec<Vec<(String, usize)>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| {
                        let plain = v.to_string();
                        (v.render(color), plain.chars().count())
                    })
                    .collect()
            })
            .collect();
        for row in &cells {
            for (w, (_, len)) in widths.iter_mut().zip(row) {
                *w = (*w).max(*len);
            }
        }

        let line = |row: &mut dyn Iterator<Item = (String, usize)>| -> String {
            let mut out = String::new();
            for (i, (text, len)) in row.enumerate() {
                if i > 0 {
                    out.push_str("  ");
                }
                out.push_str(&text);
                out.push_str(&" ".repeat(widths.get(i).copied().unwrap_or(0).saturating_sub(len)));
            }
            out.trim_end().to_owned()
        };

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(line(&mut headers.iter().map(|h| (h.clone(), h.chars().count()))));
        for row in cells {
            lines.push(line(&mut row.into_iter()));
        }
        lines
    }
}

impl Interpreter {
    pub(crate) fn exec_rad(&mut self, block: &RadBlock) -> Result<(), RadError> {
        if block.fields.is_empty() {
            return Err(RadError::arity("no fields specified in rad block"));
        }
        if let Some(source) = &block.source {
            let url = self.eval(source)?.require_str().map_err(|e| e.at(source.span))?.plain();
            debug!("rad block fetching {url}");
            let json = self.fetcher.fetch(&url).map_err(|e| e.at(source.span))?;
            bind_fields(&block.fields, &json, &self.env)?;
        }

        for m in &block.mods {
            self.apply_mod(m)?;
        }

        let lists: Vec<List> = block
            .fields
            .iter()
            .map(|f| Ok(self.lookup(f)?.require_list()?.clone()))
            .collect::<Result<_, RadError>>()?;
        let mut columns: Vec<Vec<Value>> = lists.iter().map(List::to_vec).collect();

        let rows = columns.first().map_or(0, Vec::len);
        for (name, col) in block.fields.iter().zip(&columns) {
            if col.len() != rows {
                return Err(RadError::arity(format!(
                    "columns differ in length: '{}' has {rows} row(s), '{name}' has {}",
                    block.fields[0],
                    col.len()
                )));
            }
        }

        if let Some(spec) = &block.sort {
            let rules = sort_rules(spec, &block.fields)?;
            sort_columns(&mut columns, &rules)?;
            for (list, col) in lists.iter().zip(&columns) {
                list.replace_all(col.clone());
            }
        }

        if block.kind == RadKind::Request {
            debug!("request block bound {rows} row(s)");
            return Ok(());
        }
        let table: Vec<Vec<Value>> = (0..rows).map(|r| columns.iter().map(|c| c[r].clone()).collect()).collect();
        let color = self.color();
        let lines = self.renderer.render(&block.fields, &table, color);
        for line in lines {
            self.emit(line);
        }
        Ok(())
    }

    fn apply_mod(&mut self, m: &FieldMod) -> Result<(), RadError> {
        match m {
            FieldMod::Map { fields, lambda } => {
                let f = self.eval(lambda)?.require_fn().map_err(|e| e.at(lambda.span))?.clone();
                for field in fields {
                    let list = self.lookup(field)?.require_list()?.clone();
                    let mut mapped = Vec::with_capacity(list.len());
                    for cell in list.to_vec() {
                        let mut out = self.call(&f, CallArgs::new(vec![cell]))?;
                        mapped.push(if out.is_empty() { Value::Null } else { out.swap_remove(0) });
                    }
                    list.replace_all(mapped);
                }
            }
            FieldMod::Color { fields, color, regex } => {
                let name = self.eval(color)?.require_str().map_err(|e| e.at(color.span))?.plain();
                let attr = Attr::from_name(&name)
                    .ok_or_else(|| RadError::type_mismatch(format!("unknown color '{name}'")).at(color.span))?;
                let pattern = self.eval(regex)?.require_str().map_err(|e| e.at(regex.span))?.plain();
                let re = Regex::new(&pattern).map_err(|e| RadError::Parse(e.to_string()).at(regex.span))?;
                for field in fields {
                    let list = self.lookup(field)?.require_list()?.clone();
                    let colored = list
                        .to_vec()
                        .into_iter()
                        .map(|cell| match cell {
                            Value::Str(s) => Value::Str(highlight(&s, &re, attr)),
                            other => other,
                        })
                        .collect();
                    list.replace_all(colored);
                }
            }
        }
        Ok(())
    }
}

fn sort_rules(spec: &SortSpec, fields: &[String]) -> Result<Vec<SortRule>, RadError> {
    match spec {
        SortSpec::General(dir) => Ok(general_rules(fields.len(), *dir)),
        SortSpec::Columns(cols) => cols
            .iter()
            .map(|(name, dir)| {
                fields
                    .iter()
                    .position(|f| f == name)
                    .map(|i| SortRule::new(i, *dir))
                    .ok_or_else(|| RadError::UnknownIdentifier { name: name.clone(), suggestions: Vec::new() })
            })
            .collect(),
    }
}

/// `s` with `attr` applied to every non-empty match of `re`.
pub fn highlight(s: &RichStr, re: &Regex, attr: Attr) -> RichStr {
    let plain = s.plain();
    let char_pos = |byte: usize| plain[..byte].chars().count();
    let mut out = RichStr::new();
    let mut last = 0;
    for m in re.find_iter(&plain).filter(|m| !m.is_empty()) {
        let (start, end) = (char_pos(m.start()), char_pos(m.end()));
        out = out.concat(&s.slice(last, start)).concat(&s.slice(start, end).with_attr(attr));
        last = end;
    }
    out.concat(&s.slice(last, s.char_count()))
}
