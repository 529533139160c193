//! Ordered AND-chain of algos.

use super::algo::{Algo, AlgoContext};

#[derive(Debug, Default)]
pub struct AlgoStack {
    stack: Vec<Box<dyn Algo>>,
}

impl AlgoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, algo: Box<dyn Algo>) {
        self.stack.push(algo);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Algo> {
        self.stack.iter().map(|a| a.as_ref())
    }

    /// Runs every algo in insertion order and stops at the first failure.
    /// An empty stack passes.
    pub fn run(&mut self, ctx: &mut AlgoContext<'_>) -> bool {
        for algo in self.stack.iter_mut() {
            if !algo.run(ctx) {
                return false;
            }
        }
        true
    }
}

impl Extend<Box<dyn Algo>> for AlgoStack {
    fn extend<I: IntoIterator<Item = Box<dyn Algo>>>(&mut self, iter: I) {
        self.stack.extend(iter);
    }
}
