//! Human-readable rendering of definitions, used in logs and error reports

use super::{Argument, Definition, MethodInjection, ObjectDefinition};
use crate::invoker::Parameters;
use std::fmt::{self, Display, Formatter, Write};

impl Display for Definition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Value(d) => write!(f, "Value ({:?})", d.value()),
            Definition::Reference(d) => write!(f, "get({})", d.target()),
            Definition::EnvironmentVariable(d) => {
                f.write_str("Environment variable (\n")?;
                writeln!(f, "    variable = {}", d.variable())?;
                writeln!(f, "    optional = {}", if d.is_optional() { "yes" } else { "no" })?;
                if d.is_optional() {
                    writeln!(f, "    default = {}", indent(&argument(d.default_value())))?;
                }
                f.write_str(")")
            }
            Definition::String(d) => write!(f, "String ({:?})", d.template()),
            Definition::Array(d) => list(f, "[", d.values(), "]"),
            Definition::ArrayExtension(d) => {
                list(f, "add([", d.values(), "])")?;
                if let Some(previous) = d.extended() {
                    write!(f, "\nextending {}", previous.variant())?;
                }
                Ok(())
            }
            Definition::Object(d) => object(f, d),
            Definition::Factory(d) => {
                write!(f, "Factory ({})", d.callable().describe())?;
                parameters(f, d.parameters())
            }
            Definition::Decorator(d) => {
                write!(f, "Decorate ({})", d.factory().callable().describe())?;
                parameters(f, d.factory().parameters())
            }
            Definition::Instance(d) => {
                write!(f, "Instance of {} ", d.instance().class())?;
                object(f, d.object_definition())
            }
        }
    }
}

fn argument(argument: &Argument) -> String {
    match argument {
        Argument::Value(value) => format!("{value:?}"),
        Argument::Definition(definition) => definition.to_string(),
    }
}

fn indent(text: &str) -> String {
    text.replace('\n', "\n    ")
}

fn list(f: &mut Formatter<'_>, open: &str, values: &[Argument], close: &str) -> fmt::Result {
    if values.is_empty() {
        return write!(f, "{open}{close}");
    }
    writeln!(f, "{open}")?;
    for (index, value) in values.iter().enumerate() {
        writeln!(f, "    {} => {},", index, indent(&argument(value)))?;
    }
    f.write_str(close)
}

fn parameters(f: &mut Formatter<'_>, parameters: &Parameters) -> fmt::Result {
    if parameters.is_empty() {
        return Ok(());
    }
    f.write_str(" with (\n")?;
    for (key, value) in parameters.iter() {
        writeln!(f, "    {} = {}", key, indent(&argument(value)))?;
    }
    f.write_str(")")
}

fn method(out: &mut String, injection: &MethodInjection) -> fmt::Result {
    write!(out, "{}(", injection.method())?;
    let parameters: Vec<String> = injection
        .parameters()
        .iter()
        .map(|(key, value)| format!("{} = {}", key, argument(value)))
        .collect();
    if !parameters.is_empty() {
        write!(out, "\n    {}\n", indent(&parameters.join("\n")))?;
    }
    out.write_str(")")
}

fn object(f: &mut Formatter<'_>, definition: &ObjectDefinition) -> fmt::Result {
    let mut body = String::new();
    writeln!(body, "class = {}", definition.class_name())?;
    writeln!(body, "lazy = {}", definition.is_lazy())?;
    if let Some(constructor) = definition.constructor_injection() {
        method(&mut body, constructor)?;
        body.push('\n');
    }
    for property in definition.property_injections() {
        match property.class() {
            Some(class) => write!(body, "{}::${}", class, property.property())?,
            None => write!(body, "${}", property.property())?,
        }
        writeln!(body, " = {}", argument(property.value()))?;
    }
    for injection in definition.method_injections() {
        method(&mut body, injection)?;
        body.push('\n');
    }

    write!(f, "Object (\n    {}\n)", indent(body.trim_end()))
}
