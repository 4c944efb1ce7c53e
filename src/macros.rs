/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Keys must be string literals. Anything that is not a literal, list or
/// object is converted with `Value::from`; wrap such expressions in
/// parentheses.
///
/// ```rust
/// use ndserial::{value, Value};
///
/// let scale = 0.5;
/// let doc = value!({
///     "name": "mesh",
///     "offset": [-1, 0, 1],
///     "scale": (scale),
///     "parent": null
/// });
/// assert_eq!(doc.get("scale"), Some(&Value::from(0.5)));
/// ```
#[macro_export]
macro_rules! value {
    (@array [$($elems:expr,)*]) => {
        vec![$($elems,)*]
    };

    (@array [$($elems:expr,)*] - $num:literal $(, $($rest:tt)*)?) => {
        $crate::value!(@array [$($elems,)* $crate::value!(-$num),] $($($rest)*)?)
    };

    (@array [$($elems:expr,)*] $next:tt $(, $($rest:tt)*)?) => {
        $crate::value!(@array [$($elems,)* $crate::value!($next),] $($($rest)*)?)
    };

    (@object $object:ident) => {};

    (@object $object:ident $key:literal : - $num:literal $(, $($rest:tt)*)?) => {
        $object.insert(($key).to_string(), $crate::value!(-$num));
        $crate::value!(@object $object $($($rest)*)?);
    };

    (@object $object:ident $key:literal : $value:tt $(, $($rest:tt)*)?) => {
        $object.insert(($key).to_string(), $crate::value!($value));
        $crate::value!(@object $object $($($rest)*)?);
    };

    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([ $($tt:tt)* ]) => {
        $crate::Value::Array($crate::value!(@array [] $($tt)*))
    };

    ({ $($tt:tt)* }) => {{
        #[allow(unused_mut)]
        let mut object = $crate::Map::new();
        $crate::value!(@object object $($tt)*);
        $crate::Value::Object(object)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Map, Number, Value};

    #[test]
    fn test_value_macro_primitives() {
        assert_eq!(value!(null), Value::Null);
        assert_eq!(value!(true), Value::Bool(true));
        assert_eq!(value!(false), Value::Bool(false));
        assert_eq!(value!(42), Value::Number(Number::Integer(42)));
        assert_eq!(value!(-7), Value::Number(Number::Integer(-7)));
        assert_eq!(value!(3.5), Value::Number(Number::Float(3.5)));
        assert_eq!(value!("hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn test_value_macro_arrays() {
        assert_eq!(value!([]), Value::Array(vec![]));
        assert_eq!(
            value!([1, -2, [3.0, null],]),
            Value::Array(vec![
                Value::from(1),
                Value::from(-2),
                Value::Array(vec![Value::from(3.0), Value::Null]),
            ])
        );
    }

    #[test]
    fn test_value_macro_objects() {
        assert_eq!(value!({}), Value::Object(Map::new()));

        let obj = value!({
            "name": "Alice",
            "delta": -3,
            "tags": ["a", "b"],
            "nested": {"ok": true}
        });

        match obj {
            Value::Object(map) => {
                assert_eq!(map.len(), 4);
                assert_eq!(map.get("name"), Some(&Value::String("Alice".to_string())));
                assert_eq!(map.get("delta"), Some(&Value::Number(Number::Integer(-3))));
                assert_eq!(
                    map.get("nested").and_then(|v| v.get("ok")),
                    Some(&Value::Bool(true))
                );
            }
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_value_macro_expressions() {
        let inner = Value::tagged("Widget", Value::Null);
        let doc = value!({"w": (inner.clone())});
        assert_eq!(doc.get("w"), Some(&inner));
    }
}
