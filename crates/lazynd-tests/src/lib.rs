pub mod counting_source;
pub mod scenarios;

pub use counting_source::{CountingSource, FailingSource, MisbehavingSource, SourceFailure};

/// Instantiates the elementwise conformance scenarios for one operation.
///
/// `$realizer` is an expression evaluating to a `lazynd::Realizer`, so the same scenarios can
/// run sequentially and in parallel.
#[macro_export]
macro_rules! define_elementwise_tests {
    ($module:ident, $op:expr) => {
        $crate::define_elementwise_tests!($module, $op, ::lazynd::Realizer::new());
    };
    ($module:ident, $op:expr, $realizer:expr) => {
        #[cfg(test)]
        mod $module {
            #[allow(unused_imports)]
            use super::*;

            use $crate::scenarios;

            macro_rules! scenario_test {
                ($name:ident) => {
                    #[test]
                    fn $name() -> scenarios::Result {
                        let realizer = $realizer;
                        scenarios::run_case_with($op, &scenarios::$name(), &realizer)
                    }
                };
            }

            scenario_test!(vector);
            scenario_test!(matrix);
            scenario_test!(matrix_row);
            scenario_test!(volume_leading_slice);
            scenario_test!(volume_inner_slice);
            scenario_test!(volume_repeated_slice);

            #[test]
            fn shape_mismatch_at_construction() -> scenarios::Result {
                scenarios::shape_mismatch_at_construction($op)
            }

            #[test]
            fn out_of_range_index_at_index_time() -> scenarios::Result {
                scenarios::out_of_range_index_at_index_time($op)
            }
        }
    };
}
