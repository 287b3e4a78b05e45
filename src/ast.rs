//! # Filter Expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and the compiled expression tree for OData-style
//! `$filter` expressions.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Character classes and the tokens produced by the lexer
//! - **[literal]** - Constant values that can appear in a filter (numbers, strings, dates, points)
//! - **[operators]** - Binary and unary operators with their keyword spellings
//! - **[expressions]** - The typed expression tree built by the parser
//!
//! ## Quick Start
//!
//! ```text
//! Name eq 'foo' and Index gt 3
//! ```
//!
//! compiles to
//!
//! ```text
//! ((Name eq 'foo') and (Index gt 3))
//! ```
//!
//! ## Core Concepts
//!
//! ### Precedence
//!
//! From lowest to highest: `or`, `and`, `eq`/`ne`, `lt`/`gt`/`le`/`ge`, `add`/`sub`,
//! `mul`/`div`/`mod`, unary `-`/`+`/`not`, primary expressions.
//!
//! Every binary level recurses into itself for its right operand, so chains group
//! to the right: `A eq B eq C` is `A eq (B eq C)`.
//!
//! ### Literals
//!
//! ```text
//! 42        // int
//! 42L       // long
//! 3.5f      // float
//! 1e10      // double
//! 7.0       // double
//! 10m       // decimal
//! 'it''s'   // string, '' escapes a quote
//! datetime'2024-01-31T12:00:00'
//! POINT(1.5 -2 3)
//! ```
//!
//! ### Member Paths
//!
//! ```text
//! Index                   // static property of the current content
//! Title                   // dynamic field declared by the content model
//! Seo/Keywords            // field `Keywords` of the aspect `Seo`
//! ContentType             // shorthand for ContentType/Name
//! Sys.Folder/Index        // type-qualified: null unless the content is a Sys.Folder
//! ```
pub mod expressions;
pub mod literal;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, MemberPath, MemberStep};
pub use literal::{Literal, Point};
pub use operators::{BinOp, UnaryOp};
pub use tokens::{CharClass, Token, TokenKind};
