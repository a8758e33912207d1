use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, output_rows};
use crate::ops;
use crate::SectorsPlugin;

pub struct Rank;

impl PluginCommand for Rank {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors rank"
    }

    fn description(&self) -> &str {
        "Append top-5 and top-1 columns ranked by how often each category repeats"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named(
                "field",
                SyntaxShape::String,
                "Category list column, a list or ;A;B string (default: pf_inds)",
                Some('f'),
            )
            .named(
                "top5-column",
                SyntaxShape::String,
                "Name of the top-5 column (default: top5_inds)",
                None,
            )
            .named(
                "top1-column",
                SyntaxShape::String,
                "Name of the top-1 column (default: top1_inds)",
                None,
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["rank", "top", "frequency", "count", "industry"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"[[id pf_inds]; [1 ";SaaS;FinTech;SaaS"]] | sectors rank"#,
            description: "SaaS ranks first because it repeats",
            result: None,
        }]
    }

    fn run(
        &self,
        _plugin: &SectorsPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let field: String = call
            .get_flag::<String>("field")?
            .unwrap_or_else(|| "pf_inds".into());
        let top5: String = call
            .get_flag::<String>("top5-column")?
            .unwrap_or_else(|| "top5_inds".into());
        let top1: String = call
            .get_flag::<String>("top1-column")?
            .unwrap_or_else(|| "top1_inds".into());
        let head = call.head;

        let rows = input_rows(input);
        Ok(output_rows(ops::op_rank(&rows, &field, &top5, &top1), head))
    }
}
