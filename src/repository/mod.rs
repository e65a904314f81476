pub mod dynamic_return;
pub mod method;
pub mod pagination;

pub use dynamic_return::{
    DynamicReturn, DynamicReturnBuilder, RepositoryReturn, ResultStream, find_pageable,
    find_special_parameters, to_single_result,
};
pub use method::{MethodDescriptor, ReturnShape};
pub use pagination::{Direction, Limit, Page, Pageable, Sort, SpecialParameters};
