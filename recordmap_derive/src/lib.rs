use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Path, Type, parse_macro_input, spanned::Spanned};

#[proc_macro_derive(Entity, attributes(mapping))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_mapped(input, false) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[proc_macro_derive(Embeddable, attributes(mapping))]
pub fn derive_embeddable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_mapped(input, true) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FieldKind {
    Value,
    Object,
    Collection,
}

struct FieldOptions {
    kind: FieldKind,
    id: bool,
    skip: bool,
    default: bool,
    name: Option<String>,
    converter: Option<Path>,
}

struct MappedField {
    ident: syn::Ident,
    ty: Type,
    inner: Option<Type>,
    options: FieldOptions,
}

#[derive(Default)]
struct EntityOptions {
    name: Option<String>,
    default_constructor: bool,
}

fn expand_mapped(input: DeriveInput, embeddable: bool) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "mapped types cannot be generic",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "Entity/Embeddable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Entity/Embeddable can only be derived for structs",
            ));
        }
    };

    let options = parse_entity_options(&input.attrs)?;
    let record_name = options
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let mut all = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let field_options = parse_field_options(&field.attrs)?;
        if embeddable && field_options.id {
            return Err(syn::Error::new(
                field.span(),
                "embeddable types cannot declare an id field",
            ));
        }
        let inner = option_inner(&field.ty);
        all.push(MappedField {
            ident,
            ty: field.ty.clone(),
            inner,
            options: field_options,
        });
    }

    if all.iter().filter(|f| f.options.id).count() > 1 {
        return Err(syn::Error::new(
            input.span(),
            "at most one field can be marked #[mapping(id)]",
        ));
    }

    let mapped: Vec<&MappedField> = all.iter().filter(|f| !f.options.skip).collect();
    let field_mappings = mapped
        .iter()
        .map(|field| field_mapping(struct_name, field))
        .collect::<Vec<_>>();

    let instance = if options.default_constructor {
        quote!(.default_constructor())
    } else {
        constructor(struct_name, &all, &mapped)
    };

    let embeddable_const = if embeddable {
        quote!(const EMBEDDABLE: bool = true;)
    } else {
        quote!()
    };

    Ok(quote! {
        impl ::recordmap::mapping::Mapped for #struct_name {
            #embeddable_const

            fn describe() -> ::recordmap::Result<::recordmap::mapping::EntityMetadata> {
                ::recordmap::mapping::EntityMetadata::builder::<#struct_name>(#record_name)
                    #(.field(#field_mappings))*
                    #instance
                    .build()
            }
        }
    })
}

fn field_mapping(struct_name: &syn::Ident, field: &MappedField) -> TokenStream2 {
    let ident = &field.ident;
    let field_name = ident.to_string();

    let (target, get, set) = match &field.inner {
        Some(inner) => (
            inner.clone(),
            quote!(|entity| entity.#ident.as_ref()),
            quote!(|entity, value| entity.#ident = ::core::option::Option::Some(value)),
        ),
        None => (
            field.ty.clone(),
            quote!(|entity| ::core::option::Option::Some(&entity.#ident)),
            quote!(|entity, value| entity.#ident = value),
        ),
    };

    let constructor = match field.options.kind {
        FieldKind::Value => quote!(value),
        FieldKind::Object => quote!(object),
        FieldKind::Collection => quote!(collection),
    };

    let mut mapping = quote! {
        ::recordmap::mapping::FieldMapping::#constructor::<#struct_name, #target>(#field_name, #get, #set)
    };
    if let Some(name) = &field.options.name {
        mapping = quote!(#mapping.named(#name));
    }
    if field.options.id {
        mapping = quote!(#mapping.id());
    }
    if let Some(converter) = &field.options.converter {
        mapping = quote!(#mapping.converter::<#converter>());
    }
    mapping
}

/// Constructor over every mapped field in declaration order; skipped fields
/// start from `Default`.
fn constructor(struct_name: &syn::Ident, all: &[MappedField], mapped: &[&MappedField]) -> TokenStream2 {
    let signature = format!(
        "{}({})",
        struct_name,
        mapped
            .iter()
            .map(|f| {
                let ty = &f.ty;
                format!("{}: {}", f.ident, quote!(#ty).to_string().replace(' ', ""))
            })
            .collect::<Vec<_>>()
            .join(", ")
    );
    let parameters = mapped.iter().map(|f| f.ident.to_string());

    let inits = all.iter().map(|field| {
        let ident = &field.ident;
        if field.options.skip {
            return quote!(#ident: ::core::default::Default::default());
        }
        match &field.inner {
            Some(inner) => quote!(#ident: args.take_optional::<#inner>()?),
            None => {
                let ty = &field.ty;
                if field.options.default {
                    quote!(#ident: args.take_or_default::<#ty>()?)
                } else {
                    quote!(#ident: args.take::<#ty>()?)
                }
            }
        }
    });

    quote! {
        .constructor(
            #signature,
            ::std::vec![#(#parameters),*],
            |args: &mut ::recordmap::mapping::ConstructorArgs| {
                ::core::result::Result::Ok(#struct_name {
                    #(#inits),*
                })
            },
        )
    }
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();
    for attr in attrs {
        if !attr.path().is_ident("mapping") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("default_constructor") {
                options.default_constructor = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[mapping(...)] option. Supported: name = \"...\", default_constructor",
            ))
        })?;
    }
    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions {
        kind: FieldKind::Value,
        id: false,
        skip: false,
        default: false,
        name: None,
        converter: None,
    };

    for attr in attrs {
        if !attr.path().is_ident("mapping") {
            continue;
        }

        let mut kinds = 0;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                options.id = true;
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("default") {
                options.default = true;
                return Ok(());
            }

            if meta.path.is_ident("embedded") || meta.path.is_ident("entity") {
                options.kind = FieldKind::Object;
                kinds += 1;
                return Ok(());
            }

            if meta.path.is_ident("collection") {
                options.kind = FieldKind::Collection;
                kinds += 1;
                return Ok(());
            }

            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("convert") {
                let value = meta.value()?;
                options.converter = Some(value.parse::<Path>()?);
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[mapping(...)] option. Supported: id, skip, default, embedded, entity, collection, name = \"...\", convert = Type",
            ))
        })?;

        if kinds > 1 {
            return Err(syn::Error::new(
                attr.span(),
                "a field is either embedded, entity or collection",
            ));
        }
    }

    if options.converter.is_some() && options.kind != FieldKind::Value {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "convert = ... applies to value fields only",
        ));
    }

    Ok(options)
}

fn option_inner(ty: &Type) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    first_generic_type(segment)
}

fn first_generic_type(segment: &syn::PathSegment) -> Option<Type> {
    let syn::PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    for arg in &arguments.args {
        if let syn::GenericArgument::Type(ty) = arg {
            return Some(ty.clone());
        }
    }
    None
}
