//! Stop/resume protocol tests.

mod common;

use common::{app_fixture, stop_set};
use coreform::ast::{Identity, Syntax};
use coreform::macros::{Expander, StopProtocol, StopSet};
use coreform::FormError;

#[test]
fn the_producing_protocol_resumes_its_own_wrappers() {
    let fx = app_fixture();
    let expander = Expander::new(&fx.registry);
    let input = Syntax::form(&fx.my_app, vec![Syntax::int(1), Syntax::int(2)]);
    let stopped = expander
        .expand(input.clone(), stop_set(&[&fx.my_app]))
        .unwrap();

    let resumed = expander.protocol().unwrap(&stopped).unwrap();
    assert_eq!(resumed, input);
    let finished = expander.expand(resumed, StopSet::new()).unwrap();
    assert_eq!(finished.head(), Some(&fx.app));
}

#[test]
fn other_protocols_refuse_the_wrapper() {
    let fx = app_fixture();
    let first = Expander::new(&fx.registry);
    let second = Expander::new(&fx.registry);
    let input = Syntax::form(&fx.my_app, vec![Syntax::int(1), Syntax::int(2)]);
    let stopped = first.expand(input, stop_set(&[&fx.my_app])).unwrap();

    let err = second.protocol().unwrap(&stopped).unwrap_err();
    assert!(matches!(err, FormError::NotWrapped { ref expected, .. } if expected == second.protocol().tag()));
}

#[test]
fn expanders_sharing_a_tag_share_wrappers() {
    let fx = app_fixture();
    let tag = Identity::fresh("shared");
    let first = Expander::new(&fx.registry).with_protocol(StopProtocol::with_tag(tag.clone()));
    let second = Expander::new(&fx.registry).with_protocol(StopProtocol::with_tag(tag));
    let input = Syntax::form(&fx.my_app, vec![Syntax::int(1), Syntax::int(2)]);
    let stopped = first.expand(input.clone(), stop_set(&[&fx.my_app])).unwrap();
    assert_eq!(second.protocol().unwrap(&stopped).unwrap(), input);
}

#[test]
fn a_stopped_input_is_not_wrapped_twice() {
    let fx = app_fixture();
    let expander = Expander::new(&fx.registry);
    let input = Syntax::form(&fx.my_app, vec![Syntax::int(1), Syntax::int(2)]);
    let once = expander.expand(input, stop_set(&[&fx.my_app])).unwrap();
    let twice = expander.expand(once.clone(), stop_set(&[&fx.my_app])).unwrap();
    assert_eq!(twice, once);
    assert!(matches!(
        expander.protocol().wrap(once),
        Err(FormError::DoubleWrap { .. })
    ));
}

#[test]
fn unwrapping_unstopped_syntax_is_a_protocol_error() {
    let protocol = StopProtocol::new();
    let err = protocol.unwrap(&Syntax::symbol("plain")).unwrap_err();
    assert_eq!(err.error_type(), coreform::ErrorType::Protocol);
}
