use parking_lot::RwLock;
use serde_json::Value;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

type Converter = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any + Send>> + Send + Sync>;

/// Converts values supplied for bean parameters into the declared types.
///
/// Converters are keyed by source and target type. The default service
/// parses strings into numbers and booleans, narrows and widens integers,
/// and deserializes [`serde_json::Value`]s.
///
/// ```
/// use bean_context::ConversionService;
///
/// #[derive(Clone)]
/// struct Celsius(f64);
///
/// let conversions = ConversionService::default();
/// conversions.add_converter(|value: &f64| Some(Celsius(*value)));
///
/// assert_eq!(Some(8080_u16), conversions.convert::<u16>(&"8080".to_owned()));
/// assert_eq!(21.5, conversions.convert::<Celsius>(&21.5_f64).unwrap().0);
/// assert!(conversions.convert::<u8>(&"300".to_owned()).is_none());
/// ```
pub struct ConversionService {
    converters: RwLock<HashMap<(TypeId, TypeId), Converter>>,
}

impl ConversionService {
    /// Creates a service without any converters.
    #[must_use]
    pub fn empty() -> Self {
        ConversionService {
            converters: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a conversion from `S` to `T`, replacing any previous one.
    pub fn add_converter<S, T, F>(&self, converter: F)
    where
        S: Any,
        T: Any + Send,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        let converter: Converter = Arc::new(move |value: &dyn Any| {
            let value = value.downcast_ref::<S>()?;
            converter(value).map(|converted| Box::new(converted) as Box<dyn Any + Send>)
        });
        self.converters
            .write()
            .insert((TypeId::of::<S>(), TypeId::of::<T>()), converter);
    }

    /// Whether a conversion from `S` to `T` is registered.
    #[must_use]
    pub fn can_convert<S: Any, T: Any>(&self) -> bool {
        TypeId::of::<S>() == TypeId::of::<T>()
            || self
                .converters
                .read()
                .contains_key(&(TypeId::of::<S>(), TypeId::of::<T>()))
    }

    /// Converts `value` into a `T`. Values that already are a `T` are cloned.
    #[must_use]
    pub fn convert<T: Any + Clone>(&self, value: &dyn Any) -> Option<T> {
        if let Some(value) = value.downcast_ref::<T>() {
            return Some(value.clone());
        }

        let converter = self
            .converters
            .read()
            .get(&(value.type_id(), TypeId::of::<T>()))
            .cloned()?;
        converter(value)?.downcast::<T>().ok().map(|converted| *converted)
    }
}

macro_rules! add_parsers {
    ($service:ident: $($target:ty),* $(,)?) => {
        $(
            $service.add_converter(|value: &String| value.trim().parse::<$target>().ok());
            $service.add_converter(|value: &&'static str| value.trim().parse::<$target>().ok());
            $service.add_converter(|value: &Value| serde_json::from_value::<$target>(value.clone()).ok());
        )*
    };
}

macro_rules! add_integer_casts {
    ($service:ident: $($target:ty),* $(,)?) => {
        $(
            $service.add_converter(|value: &i32| <$target>::try_from(*value).ok());
            $service.add_converter(|value: &i64| <$target>::try_from(*value).ok());
            $service.add_converter(|value: &u32| <$target>::try_from(*value).ok());
            $service.add_converter(|value: &u64| <$target>::try_from(*value).ok());
            $service.add_converter(|value: &usize| <$target>::try_from(*value).ok());
        )*
    };
}

impl Default for ConversionService {
    fn default() -> Self {
        let service = ConversionService::empty();
        add_parsers!(service: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool);
        add_integer_casts!(service: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        service.add_converter(|value: &&'static str| Some((*value).to_owned()));
        service.add_converter(|value: &Value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            value => Some(value.to_string()),
        });
        service.add_converter(|value: &String| Some(Value::String(value.clone())));
        service.add_converter(|value: &i64| Some(value.to_string()));
        service.add_converter(|value: &u64| Some(value.to_string()));
        service.add_converter(|value: &f64| Some(value.to_string()));
        service.add_converter(|value: &bool| Some(value.to_string()));
        service
    }
}

impl std::fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionService")
            .field("converters", &self.converters.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_cast() {
        let conversions = ConversionService::default();

        assert_eq!(Some(true), conversions.convert::<bool>(&"true".to_owned()));
        assert_eq!(Some(-3_i8), conversions.convert::<i8>(&"-3"));
        assert_eq!(Some(7_u16), conversions.convert::<u16>(&7_i64));
        assert_eq!(None, conversions.convert::<u16>(&-7_i64));
        assert_eq!(Some(2.5_f64), conversions.convert::<f64>(&Value::from(2.5)));
        assert_eq!(Some("42".to_owned()), conversions.convert::<String>(&42_i64));
    }

    #[test]
    fn unknown_conversions_fail() {
        struct Opaque;

        let conversions = ConversionService::empty();
        assert!(conversions.convert::<u16>(&"8080".to_owned()).is_none());
        assert!(!conversions.can_convert::<Opaque, u16>());
        assert!(conversions.can_convert::<u16, u16>());
    }
}
