pub use crate::{
    ast::Micheline,
    render::{render_expression, render_schema},
    transformer::{
        transform_account, transform_block, transform_expression, transform_schema,
        transform_script,
    },
};

mod ast;
mod render;
mod transformer;
