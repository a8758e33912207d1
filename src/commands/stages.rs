use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, labeled, output_rows};
use crate::algo::stages::parse_date;
use crate::ops;
use crate::pipeline::StageConfig;
use crate::SectorsPlugin;

pub struct Stages;

impl PluginCommand for Stages {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors stages"
    }

    fn description(&self) -> &str {
        "Collect each investor's distinct funding stages after a cutoff date"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named("id", SyntaxShape::String, "Investor id column (default: id)", None)
            .named(
                "stage",
                SyntaxShape::String,
                "Raw stage column (default: stage)",
                Some('s'),
            )
            .named(
                "date",
                SyntaxShape::String,
                "Investment date column (default: date)",
                None,
            )
            .named(
                "since",
                SyntaxShape::String,
                "Only count investments after this date (default: 2019-12-31)",
                None,
            )
            .named(
                "column",
                SyntaxShape::String,
                "Output column (default: stage)",
                Some('c'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["stage", "investor", "funding", "round"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"open investments.csv | sectors stages --since 2020-06-30"#,
            description: "Distinct stages per investor for recent rounds",
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
        let mut config = StageConfig::default();
        if let Some(id) = call.get_flag::<String>("id")? {
            config.id_column = id;
        }
        if let Some(stage) = call.get_flag::<String>("stage")? {
            config.stage_column = stage;
        }
        if let Some(date) = call.get_flag::<String>("date")? {
            config.date_column = date;
        }
        if let Some(column) = call.get_flag::<String>("column")? {
            config.output_column = column;
        }
        if let Some(since) = call.get_flag::<String>("since")? {
            config.since = parse_date(&since)
                .ok_or_else(|| LabeledError::new(format!("Unrecognized date '{since}'")))?;
        }
        let head = call.head;

        let rows = input_rows(input);
        if rows.is_empty() {
            return Ok(output_rows(serde_json::Value::Null, head));
        }
        let out = ops::op_stages(&rows, &config).map_err(labeled)?;
        Ok(output_rows(out, head))
    }
}
