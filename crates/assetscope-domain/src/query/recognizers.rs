//! Built-in recognizers.

use assetscope_storage::{Predicate, PARENT_FIELD};
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::all_consuming,
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult,
};

use super::{Recognizer, Rewrite};

/// Field holding the kind of an asset.
pub const ASSET_TYPE_FIELD: &str = "asset_type";

/// The fixed table of frequently issued queries.
pub struct ExactQueryTable {
    entries: Vec<(&'static str, Predicate)>,
}

impl Default for ExactQueryTable {
    fn default() -> Self {
        let entries = vec![
            ("asset_type:block", Predicate::eq(ASSET_TYPE_FIELD, "block")),
            ("asset_type:question", Predicate::eq(ASSET_TYPE_FIELD, "question")),
            ("asset_type:template", Predicate::eq(ASSET_TYPE_FIELD, "template")),
            ("asset_type:survey", Predicate::eq(ASSET_TYPE_FIELD, "survey")),
            (
                "asset_type:question OR asset_type:block",
                Predicate::is_in(ASSET_TYPE_FIELD, ["question", "block"]),
            ),
            (
                "asset_type:question OR asset_type:block OR asset_type:template",
                Predicate::is_in(ASSET_TYPE_FIELD, ["question", "block", "template"]),
            ),
        ];
        Self { entries }
    }
}

impl Recognizer for ExactQueryTable {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn recognize(&self, query: &str) -> Rewrite {
        self.entries
            .iter()
            .find(|(q, _)| *q == query)
            .map_or(Rewrite::Miss, |(_, p)| Rewrite::Exact(p.clone()))
    }
}

/// Recognizes `(asset_type:A OR asset_type:B ...) AND (parent__uid:P)`, the
/// query issued when browsing library items inside a collection.
pub struct LibraryCollectionPattern;

impl Recognizer for LibraryCollectionPattern {
    fn name(&self) -> &'static str {
        "library_collection"
    }

    fn recognize(&self, query: &str) -> Rewrite {
        // Trailing text after the pattern is a miss, not a partial rewrite.
        match all_consuming(terminated(library_collection, multispace0))(query) {
            Ok((_, (asset_types, parent_uid))) => Rewrite::Structured(
                Predicate::is_in(ASSET_TYPE_FIELD, asset_types).and(Predicate::related(
                    PARENT_FIELD,
                    Predicate::eq("uid", parent_uid),
                )),
            ),
            Err(_) => Rewrite::Miss,
        }
    }
}

/// Parse `asset_type:<name>`
fn asset_type_term(input: &str) -> IResult<&str, &str> {
    preceded(
        tag("asset_type:"),
        take_while1(|c: char| c != ' ' && c != ')'),
    )(input)
}

/// Parse `parent__uid:<uid>`
fn parent_uid_term(input: &str) -> IResult<&str, &str> {
    preceded(tag("parent__uid:"), take_while1(|c: char| c != ')'))(input)
}

fn library_collection(input: &str) -> IResult<&str, (Vec<&str>, &str)> {
    separated_pair(
        delimited(
            char('('),
            separated_list1(tag(" OR "), asset_type_term),
            char(')'),
        ),
        tag(" AND "),
        delimited(char('('), parent_uid_term, char(')')),
    )(input)
}
