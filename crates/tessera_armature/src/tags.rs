//! Tag tables used to classify elements.

use phf::phf_set;

static HTML_TAGS: phf::Set<&'static str> = phf_set! {
    "html", "body", "base", "head", "link", "meta", "style", "title", "address", "article",
    "aside", "footer", "header", "hgroup", "h1", "h2", "h3", "h4", "h5", "h6", "nav",
    "section", "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img",
    "li", "main", "ol", "p", "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite",
    "code", "data", "dfn", "em", "i", "kbd", "mark", "q", "rp", "rt", "ruby", "s", "samp",
    "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr", "area", "audio",
    "map", "track", "video", "embed", "object", "param", "source", "canvas", "script",
    "noscript", "del", "ins", "caption", "col", "colgroup", "table", "thead", "tbody", "td",
    "th", "tr", "button", "datalist", "fieldset", "form", "input", "label", "legend",
    "meter", "optgroup", "option", "output", "progress", "select", "textarea", "details",
    "dialog", "menu", "summary", "template", "blockquote", "iframe", "tfoot", "search",
};

static SVG_TAGS: phf::Set<&'static str> = phf_set! {
    "svg", "animate", "animateMotion", "animateTransform", "circle", "clipPath",
    "color-profile", "defs", "desc", "discard", "ellipse", "feBlend", "feColorMatrix",
    "feComponentTransfer", "feComposite", "feConvolveMatrix", "feDiffuseLighting",
    "feDisplacementMap", "feDistantLight", "feDropShadow", "feFlood", "feFuncA", "feFuncB",
    "feFuncG", "feFuncR", "feGaussianBlur", "feImage", "feMerge", "feMergeNode",
    "feMorphology", "feOffset", "fePointLight", "feSpecularLighting", "feSpotLight",
    "feTile", "feTurbulence", "filter", "foreignObject", "g", "hatch", "hatchpath", "image",
    "line", "linearGradient", "marker", "mask", "mesh", "meshgradient", "meshpatch",
    "meshrow", "metadata", "mpath", "path", "pattern", "polygon", "polyline",
    "radialGradient", "rect", "set", "solidcolor", "stop", "switch", "symbol", "text",
    "textPath", "tspan", "unknown", "use", "view",
};

static VOID_TAGS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
};

static BUILTIN_COMPONENTS: phf::Set<&'static str> = phf_set! {
    "component", "Component", "Teleport", "teleport", "Suspense", "suspense",
    "KeepAlive", "keep-alive", "BaseTransition", "base-transition", "Transition",
    "transition", "TransitionGroup", "transition-group",
};

/// Native HTML or SVG element.
#[inline]
pub fn is_native_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag) || SVG_TAGS.contains(tag)
}

/// Element that never has children or an end tag.
#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Framework built-in that behaves like a component.
#[inline]
pub fn is_builtin_component(tag: &str) -> bool {
    BUILTIN_COMPONENTS.contains(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(is_native_tag("div"));
        assert!(is_native_tag("linearGradient"));
        assert!(!is_native_tag("MyButton"));
        assert!(is_void_tag("input"));
        assert!(!is_void_tag("div"));
        assert!(is_builtin_component("KeepAlive"));
    }
}
