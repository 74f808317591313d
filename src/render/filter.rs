/// One `[in]...filter,filter...[out]` chain of a filter graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filters: Vec<String>,
    pub outputs: Vec<String>,
}

impl FilterChain {
    fn render(&self) -> String {
        let mut s = String::new();
        for label in &self.inputs {
            s.push('[');
            s.push_str(label);
            s.push(']');
        }
        s.push_str(&self.filters.join(","));
        for label in &self.outputs {
            s.push('[');
            s.push_str(label);
            s.push(']');
        }
        s
    }
}

/// A `-filter_complex` graph built from labelled chains.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chain. Labels are given without brackets (`"0:v"`, `"outv"`).
    pub fn chain<I, O>(&mut self, inputs: I, filters: Vec<String>, outputs: O) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        self.chains.push(FilterChain {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filters,
            outputs: outputs.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Chains joined with `;`.
    pub fn render(&self) -> String {
        self.chains
            .iter()
            .map(FilterChain::render)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Quote `value` for use as a filter option inside a filter graph.
///
/// Two levels apply: option-level escaping of `:` and `'` and graph-level single quoting.
/// Backslashes become forward slashes so Windows paths survive both.
pub fn quote_filter_value(value: &str) -> String {
    let option_level = value
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'");
    format!("'{}'", option_level.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/filter.rs"]
mod tests;
