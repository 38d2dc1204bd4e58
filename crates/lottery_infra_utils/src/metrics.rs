//! Counter definitions shared by the lottery components. Counters are registered with the global
//! `metrics` recorder; when no recorder is installed every operation is a no-op.

use metrics::{counter, describe_counter};

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;

pub struct MetricCounter {
    name: &'static str,
    description: &'static str,
    initial_value: u64,
}

impl MetricCounter {
    pub const fn new(name: &'static str, description: &'static str, initial_value: u64) -> Self {
        Self { name, description, initial_value }
    }

    pub fn register(&self) {
        counter!(self.name).absolute(self.initial_value);
        describe_counter!(self.name, self.description);
    }

    pub fn increment(&self, value: u64) {
        counter!(self.name).increment(value);
    }

    pub fn get_name(&self) -> &'static str {
        self.name
    }

    pub fn get_description(&self) -> &'static str {
        self.description
    }
}

pub struct LabeledMetricCounter {
    name: &'static str,
    description: &'static str,
    initial_value: u64,
    label_permutations: &'static [&'static [(&'static str, &'static str)]],
}

impl LabeledMetricCounter {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        initial_value: u64,
        label_permutations: &'static [&'static [(&'static str, &'static str)]],
    ) -> Self {
        Self { name, description, initial_value, label_permutations }
    }

    pub fn register(&self) {
        self.label_permutations.iter().map(|&slice| slice.to_vec()).for_each(|labels| {
            counter!(self.name, &labels).absolute(self.initial_value);
        });
        describe_counter!(self.name, self.description);
    }

    pub fn increment(&self, value: u64, labels: &[(&'static str, &'static str)]) {
        counter!(self.name, labels).increment(value);
    }

    pub fn get_name(&self) -> &'static str {
        self.name
    }
}
