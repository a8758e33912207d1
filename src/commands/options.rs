use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, labeled, output_rows};
use crate::ops;
use crate::SectorsPlugin;

pub struct Options;

impl PluginCommand for Options {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors options"
    }

    fn description(&self) -> &str {
        "Distinct checkbox options (label, value, displayOrder, hidden) for a multi-valued column"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named(
                "column",
                SyntaxShape::String,
                "Multi-valued column (default: pf_inds)",
                Some('c'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["options", "checkbox", "property", "crm", "enumeration"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"[[pf_inds]; [";Mental Health;SaaS"]] | sectors options"#,
            description: "Options mental_health and saas",
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
        let column: String = call
            .get_flag::<String>("column")?
            .unwrap_or_else(|| "pf_inds".into());
        let head = call.head;

        let rows = input_rows(input);
        if rows.is_empty() {
            return Ok(output_rows(serde_json::Value::Null, head));
        }
        let out = ops::op_options(&rows, &column).map_err(labeled)?;
        Ok(output_rows(out, head))
    }
}
