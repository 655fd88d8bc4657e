//! Sinks for sampled trees.
//!
//! A logger is initialized once before sampling, receives every accepted
//! tree in replicate order, and is closed exactly once afterwards, also
//! when sampling fails.

use std::io;
use std::io::Write;

use pd_tree::Tree;
use pd_tree::TimedTree;

pub trait TreeLogger {
    fn init(&mut self) -> io::Result<()>;

    fn log(&mut self, sample: usize, tree: &Tree) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

impl<L: TreeLogger + ?Sized> TreeLogger for Box<L> {
    fn init(&mut self) -> io::Result<()> { (**self).init() }
    fn log(&mut self, sample: usize, tree: &Tree) -> io::Result<()> { (**self).log(sample, tree) }
    fn close(&mut self) -> io::Result<()> { (**self).close() }
}

/// Writes one Newick string per tree, optionally wrapped in a NEXUS
/// trees block.
pub struct NewickLogger<W: Write> {
    out: W,
    nexus: bool,
}

impl<W: Write> NewickLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out, nexus: false }
    }

    pub fn nexus(out: W) -> Self {
        Self { out, nexus: true }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TreeLogger for NewickLogger<W> {
    fn init(&mut self) -> io::Result<()> {
        if self.nexus {
            writeln!(self.out, "#NEXUS\n\nBegin trees;")?;
        }
        Ok(())
    }

    fn log(&mut self, sample: usize, tree: &Tree) -> io::Result<()> {
        if self.nexus {
            writeln!(self.out, "tree STATE_{sample} = {tree}")
        } else {
            writeln!(self.out, "{tree}")
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.nexus {
            writeln!(self.out, "End;")?;
        }
        self.out.flush()
    }
}

/// Tab separated root height and tree length per sample.
pub struct HeightLogger<W: Write> {
    out: W,
}

impl<W: Write> HeightLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TreeLogger for HeightLogger<W> {
    fn init(&mut self) -> io::Result<()> {
        writeln!(self.out, "Sample\trootHeight\ttreeLength")
    }

    fn log(&mut self, sample: usize, tree: &Tree) -> io::Result<()> {
        writeln!(self.out, "{sample}\t{}\t{}", tree.root_height(), tree.tree_length())
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cherry() -> Tree {
        Tree::from_newick("(A:1,B:1);").unwrap()
    }

    #[test]
    fn test_newick_logger() {
        let mut logger = NewickLogger::new(Vec::new());
        logger.init().unwrap();
        logger.log(0, &cherry()).unwrap();
        logger.log(1, &cherry()).unwrap();
        logger.close().unwrap();
        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(text, "(A:1,B:1);\n(A:1,B:1);\n");
    }

    #[test]
    fn test_nexus_logger() {
        let mut logger = NewickLogger::nexus(Vec::new());
        logger.init().unwrap();
        logger.log(3, &cherry()).unwrap();
        logger.close().unwrap();
        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert!(text.starts_with("#NEXUS"));
        assert!(text.contains("tree STATE_3 = (A:1,B:1);\n"));
        assert!(text.ends_with("End;\n"));
    }

    #[test]
    fn test_height_logger() {
        let mut logger = HeightLogger::new(Vec::new());
        logger.init().unwrap();
        logger.log(0, &cherry()).unwrap();
        logger.close().unwrap();
        let text = String::from_utf8(logger.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["Sample\trootHeight\ttreeLength", "0\t1\t2"]);
    }
}
