use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, labeled, output_rows};
use crate::ops;
use crate::SectorsPlugin;

pub struct Properties;

impl PluginCommand for Properties {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors properties"
    }

    fn description(&self) -> &str {
        "Build CRM record updates ({id, properties}) from one column"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named("id", SyntaxShape::String, "Record id column (default: id)", None)
            .named(
                "column",
                SyntaxShape::String,
                "Property column (default: pf_inds)",
                Some('c'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["crm", "hubspot", "update", "payload", "property"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"open classified.csv | sectors properties --column pf_inds | to json"#,
            description: "Update payloads for the pf_inds property",
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
        let id: String = call.get_flag::<String>("id")?.unwrap_or_else(|| "id".into());
        let column: String = call
            .get_flag::<String>("column")?
            .unwrap_or_else(|| "pf_inds".into());
        let head = call.head;

        let rows = input_rows(input);
        if rows.is_empty() {
            return Ok(output_rows(serde_json::Value::Null, head));
        }
        let out = ops::op_properties(&rows, &id, &column).map_err(labeled)?;
        Ok(output_rows(out, head))
    }
}
