use std::collections::HashMap;

use nom::{
    IResult,
    Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    combinator::{all_consuming, map, value},
    multi::many0,
    sequence::delimited,
};
use serde::Deserialize;

use crate::error::{ArgError, ConfigError};

/// One piece of a pass template string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A command line token with `{name}` substitution points, parsed once at
/// config load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        all_consuming(many0(segment))
            .parse(source)
            .map(|(_, segments)| Self { segments })
            .map_err(|err| ConfigError::MalformedTemplate {
                template: source.to_owned(),
                reason: err.to_string(),
            })
    }

    /// Renders the template, failing on the first placeholder with no value.
    pub fn render(&self, placeholders: &HashMap<String, String>) -> Result<String, ArgError> {
        let mut rendered = String::new();
        for segment in &self.segments {
            match *segment {
                Segment::Literal(ref text) => rendered.push_str(text),
                Segment::Placeholder(ref name) => rendered.push_str(
                    placeholders
                        .get(name)
                        .ok_or_else(|| ArgError::MissingPlaceholder(name.clone()))?,
                ),
            }
        }
        Ok(rendered)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        value(Segment::Literal("{".to_owned()), tag("{{")),
        value(Segment::Literal("}".to_owned()), tag("}}")),
        map(
            delimited(tag("{"), take_while1(is_name_char), tag("}")),
            |name: &str| Segment::Placeholder(name.to_owned()),
        ),
        map(is_not("{}"), |text: &str| Segment::Literal(text.to_owned())),
    ))
    .parse(input)
}

/// A token of a pipeline pass: either a template or the spot where the
/// accumulated extra arguments are spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassToken {
    Template(Template),
    Args,
}

/// The argument marker is written as an empty inline table (`{}`) in the config.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgsMarker {}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawPassToken {
    Text(String),
    Args(ArgsMarker),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    tokens: Vec<PassToken>,
}

impl Pass {
    pub fn from_raw(index: usize, raw: Vec<RawPassToken>) -> Result<Self, ConfigError> {
        let tokens = raw
            .into_iter()
            .map(|token| match token {
                RawPassToken::Text(text) => Template::parse(&text).map(PassToken::Template),
                RawPassToken::Args(_) => Ok(PassToken::Args),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = tokens
            .iter()
            .filter(|&token| *token == PassToken::Args)
            .count();
        if count != 1 {
            return Err(ConfigError::MarkerCount { pass: index, count });
        }

        Ok(Self { tokens })
    }

    /// Splices `args` in at the marker and renders every resulting token.
    ///
    /// Spliced arguments are templates as well, so option args can refer to
    /// placeholders such as `{crf}`.
    pub fn expand(
        &self,
        args: &[String],
        placeholders: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<String>> {
        let mut command = Vec::with_capacity(self.tokens.len() + args.len());
        for token in &self.tokens {
            match *token {
                PassToken::Template(ref template) => command.push(template.render(placeholders)?),
                PassToken::Args => {
                    for arg in args {
                        command.push(Template::parse(arg)?.render(placeholders)?);
                    }
                }
            }
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn template_substitutes_placeholders() {
        let template = Template::parse("scale={width}:-1,fps={fps}").unwrap();
        let rendered = template
            .render(&placeholders(&[("width", "512"), ("fps", "30")]))
            .unwrap();
        assert_eq!(rendered, "scale=512:-1,fps=30");
    }

    #[test]
    fn template_escapes_braces() {
        let template = Template::parse("{{literal}} {x}").unwrap();
        assert_eq!(
            template.render(&placeholders(&[("x", "1")])).unwrap(),
            "{literal} 1"
        );
    }

    #[test]
    fn template_rejects_unbalanced_braces() {
        for source in ["{input", "out}", "{}", "a{b c}"] {
            assert!(matches!(
                Template::parse(source),
                Err(ConfigError::MalformedTemplate { ref template, .. }) if template == source
            ));
        }
    }

    #[test]
    fn template_reports_unset_placeholder() {
        let template = Template::parse("{missing}").unwrap();
        assert_eq!(
            template.render(&HashMap::new()),
            Err(ArgError::MissingPlaceholder("missing".to_owned()))
        );
    }

    #[test]
    fn pass_requires_exactly_one_marker() {
        let none = vec![RawPassToken::Text("ffmpeg".to_owned())];
        assert_eq!(
            Pass::from_raw(0, none),
            Err(ConfigError::MarkerCount { pass: 0, count: 0 })
        );

        let two = vec![
            RawPassToken::Args(ArgsMarker {}),
            RawPassToken::Args(ArgsMarker {}),
        ];
        assert_eq!(
            Pass::from_raw(3, two),
            Err(ConfigError::MarkerCount { pass: 3, count: 2 })
        );
    }

    #[test]
    fn pass_splices_args_at_marker() {
        let pass = Pass::from_raw(0, vec![
            RawPassToken::Text("ffmpeg".to_owned()),
            RawPassToken::Text("-i".to_owned()),
            RawPassToken::Text("{input}".to_owned()),
            RawPassToken::Args(ArgsMarker {}),
            RawPassToken::Text("{output}".to_owned()),
        ])
        .unwrap();

        let command = pass
            .expand(
                &["-crf".to_owned(), "{crf}".to_owned(), "-an".to_owned()],
                &placeholders(&[("input", "in.mp4"), ("output", "out.webm"), ("crf", "30")]),
            )
            .unwrap();
        assert_eq!(command, vec![
            "ffmpeg", "-i", "in.mp4", "-crf", "30", "-an", "out.webm"
        ]);
    }
}
