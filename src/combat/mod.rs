pub mod conditions;
pub mod damage;
pub mod magic;
pub mod rules;
