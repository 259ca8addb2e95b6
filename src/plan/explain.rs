use std::borrow::Cow;
use std::io::{BufWriter, Write};

use ptree::print_config::UTF_CHARS;
use ptree::{write_tree_with, PrintConfig, Style, TreeItem};

use crate::plan::{Plan, PlanNode};

impl<'a> TreeItem for &'a PlanNode {
    type Child = Self;

    fn write_self<W: Write>(&self, f: &mut W, style: &Style) -> std::io::Result<()> {
        write!(f, "{}", style.paint(self.operator()))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(
            self.inputs()
                .iter()
                .map(|c| &**c)
                .collect::<Vec<&'a PlanNode>>(),
        )
    }
}

pub fn explain<W: Write>(plan: &Plan, output: &mut W) -> std::io::Result<()> {
    let config = PrintConfig {
        indent: 3,
        characters: UTF_CHARS.into(),
        ..Default::default()
    };
    write_tree_with(&&*plan.root(), output, &config)
}

pub fn explain_to_string(plan: &Plan) -> std::io::Result<String> {
    let mut buf = BufWriter::new(Vec::new());
    explain(plan, &mut buf)?;

    let bytes = buf.into_inner()?;
    Ok(String::from_utf8(bytes).expect("explain output is utf8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Limit;
    use crate::plan::LogicalPlanBuilder;
    use crate::test_utils::table_get;

    #[test]
    fn test_explain_logical_plan() {
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .limit(Limit::new(5, 0))
            .build();

        let result = explain_to_string(&plan).unwrap();

        assert!(result.starts_with("LogicalLimit"));
        assert!(result.contains("limit: 5"));
        assert!(result.contains("LogicalGet"));
        assert!(result.contains("\"t1\""));
    }
}
