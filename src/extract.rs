//! Answer text extraction from generation responses.
//!
//! Upstream response trees differ between model families and API versions,
//! so the answer is located by trying a sequence of known shapes, most
//! specific first, before a depth-first search for any `text` field.
//! Structural mismatches only mean a shape does not apply; extraction never
//! fails, it finds nothing.

use serde_json::Value;
use log::trace;

/// A shape heuristic: returns the answer text if the tree matches
pub type ShapeFn = for<'a> fn(&'a Value) -> Option<&'a str>;

/// Named shape heuristic
#[derive(Clone, Copy)]
pub struct Shape
{   pub name: &'static str
  , pub find: ShapeFn
}

impl std::fmt::Debug for Shape
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_tuple("Shape").field(&self.name).finish()
    }
}

/// `candidates[0].content` in its block-list or parts-mapping form
pub const CANDIDATES: Shape = Shape
{   name: "candidates"
  , find: candidates_text
};

/// `output[].content[].text`
pub const OUTPUT: Shape = Shape
{   name: "output"
  , find: output_text
};

/// Depth-first search for any string under a `text` key
pub const DEEP_SEARCH: Shape = Shape
{   name: "deep-search"
  , find: deep_search_text
};

/// Ordered shape list. Extra shapes run after the built-in specific
/// shapes and before the deep search fallback.
#[derive(Debug, Clone)]
pub struct Extractor
{   shapes: Vec<Shape>
}

impl Default for Extractor
{   fn default() -> Self
    {   Extractor
        {   shapes: vec![CANDIDATES, OUTPUT]
        }
    }
}

impl Extractor
{   pub fn new() -> Self
    {   Self::default()
    }

    /// Register a shape for a response layout the built-ins miss
    pub fn with_shape(mut self, shape: Shape) -> Self
    {   self.shapes.push(shape);
        self
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape>
    {   self.shapes.iter().chain(std::iter::once(&DEEP_SEARCH))
    }

    /// First non-empty answer text, or `None`
    pub fn extract<'a>(&self, tree: &'a Value) -> Option<&'a str>
    {   self.shapes().find_map(|shape| {
          let found = (shape.find)(tree).filter(|t| !t.is_empty());
          if found.is_some()
          {   trace!("Answer text found by {} shape", shape.name);
          }
          found
        })
    }
}

/// Extract with the built-in shapes
pub fn extract(tree: &Value) -> Option<&str>
{   Extractor::default().extract(tree)
}

fn non_empty(value: &Value) -> Option<&str>
{   value.as_str().filter(|s| !s.is_empty())
}

fn first_part_text(parts: &Value) -> Option<&str>
{   match parts.as_array()?.first()?
    {   Value::String(text) => Some(text.as_str()).filter(|s| !s.is_empty())
      , part => part.get("text").and_then(non_empty)
    }
}

fn candidates_text(tree: &Value) -> Option<&str>
{   let content = tree
      .get("candidates")?
      .as_array()?
      .first()?
      .get("content")?;

    match content
    {   Value::Array(blocks) => blocks.iter().find_map(|block| {
          block.get("text")
            .and_then(non_empty)
            .or_else(|| first_part_text(block.get("parts")?))
        })
      , Value::Object(map) => first_part_text(map.get("parts")?)
      , _ => None
    }
}

fn output_text(tree: &Value) -> Option<&str>
{   tree.get("output")?
      .as_array()?
      .iter()
      .find_map(|item| {
        item.get("content")?
          .as_array()?
          .iter()
          .find_map(|c| c.get("text").and_then(non_empty))
      })
}

fn deep_search_text(tree: &Value) -> Option<&str>
{   match tree
    {   Value::String(_) => non_empty(tree)
      , _ => find_text_field(tree)
    }
}

fn find_text_field(value: &Value) -> Option<&str>
{   match value
    {   Value::Object(map) => map
          .get("text")
          .and_then(non_empty)
          .or_else(|| map.values().find_map(find_text_field))
      , Value::Array(items) => items.iter().find_map(find_text_field)
      , _ => None
    }
}
